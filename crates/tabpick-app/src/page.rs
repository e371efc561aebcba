// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Page surface the session is rendered onto.
//!
//! The model never reads classes back; `sync_page` derives every class and
//! attribute from a `Session` and writes only the differences.

use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::{HoverTarget, PackedLists, Session};

pub const HEADER_CLASS: &str = "ishead";
pub const HOT_CLASS: &str = "markpos";
pub const ANCHOR_CLASS: &str = "isanchor";
pub const BODY_CLASS: &str = "isbody";
pub const INTERACTIVE_CLASS: &str = "sethead";

pub const HEADER_LIST_FIELD: &str = "hlist";
pub const POPUP_LIST_FIELD: &str = "plist";

pub const DEFAULT_ICON_PATH: &str = "templates/default/images/icons/";
pub const DEFAULT_ROW_TOGGLE_SRC: &str = "templates/default/images/toggle.png";

/// Element lookup, class membership and attribute access by element id.
pub trait Page {
    fn has_element(&self, id: &str) -> bool;
    fn has_class(&self, id: &str, class: &str) -> bool;
    fn add_class(&mut self, id: &str, class: &str);
    fn remove_class(&mut self, id: &str, class: &str);
    fn attribute(&self, id: &str, name: &str) -> Option<String>;
    fn set_attribute(&mut self, id: &str, name: &str, value: &str);
}

pub fn popup_header_id(col: usize) -> String {
    format!("pophot{col}")
}

pub fn row_toggle_id(row: usize) -> String {
    format!("rowtoggle{row}")
}

/// Adds or removes `class` on `id`, touching the element only when its
/// membership differs.
pub fn set_class<P: Page + ?Sized>(page: &mut P, id: &str, class: &str, on: bool) {
    match (on, page.has_class(id, class)) {
        (true, false) => page.add_class(id, class),
        (false, true) => page.remove_class(id, class),
        _ => {}
    }
}

/// `_over` variant of an image source: `a/b.png` becomes `a/b_over.png`.
pub fn hover_source(src: &str) -> String {
    let file_start = src.rfind('/').map_or(0, |index| index + 1);
    match src[file_start..].rfind('.') {
        Some(dot) => {
            let dot = file_start + dot;
            format!("{}_over{}", &src[..dot], &src[dot..])
        }
        None => format!("{src}_over"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub icon_path: String,
    pub row_toggle_src: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            icon_path: DEFAULT_ICON_PATH.to_owned(),
            row_toggle_src: DEFAULT_ROW_TOGGLE_SRC.to_owned(),
        }
    }
}

/// Brings `page` in line with `session`. Elements missing from the page are
/// skipped.
pub fn sync_page<P: Page + ?Sized>(page: &mut P, session: &Session, options: &RenderOptions) {
    let headers = session.headers();
    let picker = session.picker();

    for coord in headers.coords() {
        let id = coord.element_id();
        if !page.has_element(&id) {
            continue;
        }
        let flags = headers.flags(coord).unwrap_or_default();
        set_class(page, &id, INTERACTIVE_CLASS, true);
        set_class(page, &id, HEADER_CLASS, flags.header);
        set_class(page, &id, HOT_CLASS, flags.hot);
        set_class(page, &id, ANCHOR_CLASS, picker.is_anchor_highlighted(coord.col));
        set_class(page, &id, BODY_CLASS, picker.is_body_highlighted(coord.col));
    }

    for (col, state) in picker.columns() {
        let id = popup_header_id(col);
        if !page.has_element(&id) {
            continue;
        }
        let hovered = session.hover() == Some(HoverTarget::PopupHeader(col));
        let src = state.mode.icon_source(&options.icon_path, hovered);
        page.set_attribute(&id, "src", &src);
        page.set_attribute(&id, "title", &state.title);
    }

    for row in session.bounds().rows() {
        let id = row_toggle_id(row);
        if !page.has_element(&id) {
            continue;
        }
        let src = if session.hover() == Some(HoverTarget::RowToggle(row)) {
            hover_source(&options.row_toggle_src)
        } else {
            options.row_toggle_src.clone()
        };
        page.set_attribute(&id, "src", &src);
    }
}

/// Writes both lists into their hidden fields. Returns an alert for each
/// missing field; the other field is still written.
pub fn store_lists<P: Page + ?Sized>(page: &mut P, lists: &PackedLists) -> Vec<String> {
    let mut alerts = Vec::new();
    for (field, value, alert) in [
        (
            HEADER_LIST_FIELD,
            &lists.headers,
            "Missing header list element!",
        ),
        (
            POPUP_LIST_FIELD,
            &lists.popups,
            "Missing popup list element!",
        ),
    ] {
        if page.has_element(field) {
            page.set_attribute(field, "value", value);
        } else {
            warn!(field, "hidden list field missing");
            alerts.push(alert.to_owned());
        }
    }
    alerts
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
}

/// In-memory page keyed by element id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementPage {
    elements: BTreeMap<String, Element>,
}

impl ElementPage {
    /// A page with every element `sync_page` and `store_lists` write to.
    pub fn for_session(session: &Session) -> Self {
        let mut page = Self::default();
        for coord in session.headers().coords() {
            page.insert(coord.element_id());
        }
        for col in session.bounds().columns() {
            page.insert(popup_header_id(col));
        }
        for row in session.bounds().rows() {
            page.insert(row_toggle_id(row));
        }
        page.insert(HEADER_LIST_FIELD);
        page.insert(POPUP_LIST_FIELD);
        page
    }

    pub fn insert(&mut self, id: impl Into<String>) {
        self.elements.entry(id.into()).or_default();
    }

    pub fn remove(&mut self, id: &str) -> Option<Element> {
        self.elements.remove(id)
    }
}

impl Page for ElementPage {
    fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn has_class(&self, id: &str, class: &str) -> bool {
        self.elements
            .get(id)
            .is_some_and(|element| element.classes.contains(class))
    }

    fn add_class(&mut self, id: &str, class: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.classes.insert(class.to_owned());
        }
    }

    fn remove_class(&mut self, id: &str, class: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.classes.remove(class);
        }
    }

    fn attribute(&self, id: &str, name: &str) -> Option<String> {
        self.elements
            .get(id)
            .and_then(|element| element.attributes.get(name))
            .cloned()
    }

    fn set_attribute(&mut self, id: &str, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element
                .attributes
                .insert(name.to_owned(), value.to_owned());
        }
    }
}
