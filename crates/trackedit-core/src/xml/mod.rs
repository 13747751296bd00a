pub mod arena;
pub mod builder;
pub mod namespaces;
pub mod node;
pub mod parser;
pub mod xname;

pub use arena::XmlTree;
pub use node::NodeData;
pub use xname::{XAttribute, XName};
