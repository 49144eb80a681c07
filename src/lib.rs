//! Click-by-click walkthrough recorder.
//!
//! Every left click during a recording becomes a highlighted screenshot
//! ([`recorder`]). Steps can be titled and annotated, saved as project
//! bundles ([`archive`]) and exported as paginated PDF guides ([`export`]).

pub mod archive;
pub mod error;
pub mod export;
pub mod recorder;
pub mod settings;

pub use error::{Error, Result};
pub use export::layout::{paginate, PageGeometry, PageLayout};
pub use recorder::types::{Annotation, AnnotationKind, Placement, Step};
pub use recorder::Recorder;
pub use settings::Settings;
