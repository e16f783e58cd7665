pub mod xml_locator;

pub use xml_locator::XmlLocator;
