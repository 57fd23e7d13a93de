//! Render README, license and packaging templates.
//!
//! ```rust
//! use boilerplate::{Namespace, Renderer, UserConfig};
//!
//! let renderer = Renderer::new(UserConfig::from_iter([("author", "King Tubby")]));
//! let plan = Namespace::new().with("name", "dub").with("tests", true);
//! let ns = Namespace::new().with("plan", plan);
//! let readme = renderer
//!     .render("# {{ plan.name }}\n{? plan.tests ?}\nby {{ author }}\n{? end ?}\n", &ns)
//!     .unwrap();
//! assert_eq!(readme, "# dub\nby King Tubby\n");
//! ```

pub mod config;
pub mod error;
pub mod namespace;
pub mod renderer;

pub use boilerplate_parser::{Lookup, Namespace, TemplateError, Value};
pub use config::UserConfig;
pub use error::{Error, Result};
pub use renderer::{Renderer, copy, render, render_directory, render_file};
