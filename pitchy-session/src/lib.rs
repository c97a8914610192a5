//! Pitchy capture sessions
//!
//! [`SessionController`] drives one capture session over any
//! [`AudioSource`](pitchy_audio::AudioSource): it publishes pitch events from
//! a worker pool, exports 16kHz slices on demand and persists the full
//! recording through a [`Storage`].
//!
//! ```no_run
//! use pitchy_audio::PushSource;
//! use pitchy_session::{FsStorage, SessionConfig, SessionController};
//!
//! # fn main() -> pitchy_session::Result<()> {
//! let source = PushSource::new(44100);
//! let input = source.handle();
//!
//! let session = SessionController::new(Box::new(source), Box::new(FsStorage::new("recordings")));
//! session.init(SessionConfig::default().record_full_audio(true))?;
//! session.start()?;
//!
//! input.push(&vec![0.0; 4096]);
//! let slice = session.slice()?;
//! println!("{} ms", slice.duration);
//!
//! session.save_recording("take-1")?;
//! session.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod storage;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use dispatch::DispatchStats;
pub use error::{Result, SessionError};
pub use events::{PitchEvent, PitchEvents};
pub use storage::{FsStorage, Storage};
