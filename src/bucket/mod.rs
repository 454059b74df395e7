mod bucket_factory;
pub use bucket_factory::*;

mod fixed_window_bucket;
pub use fixed_window_bucket::Bucket;
