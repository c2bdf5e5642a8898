// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod autoscroll;
pub mod chat_list;
pub mod drag;
pub mod folders;
pub mod geometry;
pub mod ids;
pub mod model;
pub mod selection;
pub mod service;
pub mod state;

pub use autoscroll::*;
pub use chat_list::*;
pub use drag::*;
pub use folders::*;
pub use geometry::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use service::*;
pub use state::*;
