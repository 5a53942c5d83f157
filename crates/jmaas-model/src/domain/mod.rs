mod job_key;
pub use job_key::JobKey;

mod job_id;
pub use job_id::JobId;

mod job_name;
pub use job_name::JobName;

mod job_spec;
pub use job_spec::{JobSpec, MODE_CONCURRENCY, MODE_QPS};

mod job_config;
pub use job_config::JobConfig;

mod job_status;
pub use job_status::JobStatus;

mod job_info;
pub use job_info::JobInfo;

/// Ordered string map used for query parameters and request headers.
pub type Metadata = std::collections::BTreeMap<String, String>;

/// Latency value in milliseconds.
pub type LatencyMs = u32;
