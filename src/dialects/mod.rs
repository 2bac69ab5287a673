//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mapx.
//! The Mapx project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Dialects
//!
//! Concrete bindings of the rule language. Each dialect picks a product type
//! and registers the functions producing it on top of the base language.
//!
//! | Dialect | Feature | Product | Functions |
//! |---------|---------|---------|-----------|
//! | [`MxMappingDialect`] | `mapping-dialect` | [`MxMapping`](crate::mapping::MxMapping) | `include()`, `exists(template)` |
//! | [`MxTextDialect`] | `text-dialect` | `String` | `format(template)`, `json(/pretty)` |

#[cfg(feature = "mapping-dialect")]
pub mod mapping;
#[cfg(feature = "text-dialect")]
pub mod text;

#[cfg(feature = "mapping-dialect")]
pub use mapping::{MxEntityChecker, MxMappingDialect};
#[cfg(feature = "text-dialect")]
pub use text::MxTextDialect;
