//! Recursive web research
//!
//! Turns one question into a quality-gated crawl of search results and
//! hyperlinks, then synthesizes an answer from the best pages found.
//!
//! # Components
//!
//! - [`ResearchPrimitives`] - keyword expansion, page analysis and answer
//!   synthesis, each one cached oracle call
//! - [`Session`] - visited URLs and accepted articles for one run
//! - [`Orchestrator`] - the budgeted, concurrency-limited crawl
//! - [`ProgressStream`] - the caller's view of a run
//!
//! # Usage
//!
//! ```ignore
//! use deepsearch::research::{Orchestrator, ProgressEvent};
//! use futures::StreamExt;
//!
//! let mut stream = orchestrator.run("benefits of static typing", budget)?;
//! while let Some(event) = stream.next().await {
//!     match event {
//!         ProgressEvent::Progress { fraction, status } => println!("{:>3.0}% {}", fraction * 100.0, status),
//!         ProgressEvent::Failure { reason } => eprintln!("failed: {}", reason),
//!         ProgressEvent::Done { answer, .. } => println!("{}", answer),
//!     }
//! }
//! ```

pub mod orchestrator;
pub mod primitives;
pub mod progress;
pub mod prompts;
pub mod session;

pub use orchestrator::Orchestrator;
pub use primitives::ResearchPrimitives;
pub use progress::{ProgressEvent, ProgressSink, ProgressStream};
pub use session::{Acceptance, Session};
