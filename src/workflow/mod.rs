pub mod edge;
pub mod graph;
pub mod insert;
pub mod node;
pub mod serializer;
