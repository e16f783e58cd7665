pub mod attribute_extractor;

pub use attribute_extractor::AttributeExtractor;
