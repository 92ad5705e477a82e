pub mod catalog;
pub mod field;
pub mod normalize;
pub mod record;
pub mod table;

pub use catalog::{bindings, Customer, Order, OrderItem, Product, StreamBinding};
pub use field::{ColumnRange, FieldSpec, FieldType, RecordSchema};
pub use normalize::normalize;
pub use record::{build_record, AnalyticalRecord, AnalyticalRow, CdcAnnotation, RecordKind};
pub use table::DestinationTable;
