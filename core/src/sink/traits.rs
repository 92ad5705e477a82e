use shared::error::Result;

use crate::schema::AnalyticalRow;

/// A destination stream that accepts validated analytical records.
///
/// `send` is fire-and-forget from the router's perspective and must not
/// block: delivery to the OLAP store, and any retry around it, belongs to
/// the sink. An `Err` means the record was not accepted at all.
pub trait Sink: Send + Sync {
  /// Stream name, used in logs and metrics.
  fn name(&self) -> &str;

  fn send(&self, row: AnalyticalRow) -> Result<()>;
}
