pub mod category;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod filter;
pub mod notify;
pub mod ordering;
pub mod paging;
pub mod reconciler;
pub mod record;
pub mod remote;
pub mod session;
pub mod store;
pub mod telemetry;

pub use category::{Category, UNCATEGORIZED};
pub use config::{load_config, FailurePolicy, ReviewConfig};
pub use csv_io::{export_rows, import_rows, ExportMode, ExportTable};
pub use error::{ConfigError, DecodeError, RemoteError, Result, ReviewError, TelemetryError};
pub use filter::{is_visible, FilterState};
pub use notify::{Notification, NotificationKind, Notifier};
pub use ordering::{ByDateDesc, ByPredictedRank, OrderingKind, RecordOrdering};
pub use paging::{page_window, PageCursor, PageItem};
pub use reconciler::{LabelChange, LabelOutcome, LabelReconciler};
pub use record::{JobField, JobId, JobRecord, Prediction};
pub use remote::{HttpJobService, JobService};
pub use session::{FetchOutcome, ReviewSession};
pub use store::{FieldUpdate, RecordStore, SharedStore};
