// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod headers;
pub mod ids;
pub mod lists;
pub mod model;
pub mod page;
pub mod popups;
pub mod state;

pub use headers::*;
pub use ids::*;
pub use lists::*;
pub use model::*;
pub use page::*;
pub use popups::*;
pub use state::*;
