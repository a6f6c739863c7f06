// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Decoding, parsing, and schema validation of uploaded datasets

mod dataset_loader;

pub use dataset_loader::DatasetLoader;
