use shared::lsn::Lsn;

use crate::schema::AnalyticalRow;

/// Rows drained from one stream buffer, written to the store as a single
/// insert.
///
/// The position range is kept for logging; ordering inside the batch is
/// irrelevant because the destination keeps the highest `position` per key.
pub struct RowBatch {
  rows: Vec<AnalyticalRow>,
  min_position: Lsn,
  max_position: Lsn,
  deletes: usize,
}

impl RowBatch {
  pub fn new() -> Self {
    Self::with_capacity(0)
  }

  pub fn with_capacity(cap: usize) -> Self {
    Self {
      rows: Vec::with_capacity(cap),
      min_position: Lsn::MAX,
      max_position: Lsn::ZERO,
      deletes: 0,
    }
  }

  pub fn push(&mut self, row: AnalyticalRow) {
    if row.position < self.min_position {
      self.min_position = row.position;
    }
    if row.position > self.max_position {
      self.max_position = row.position;
    }
    if row.deleted {
      self.deletes += 1;
    }
    self.rows.push(row);
  }

  pub fn rows(&self) -> &[AnalyticalRow] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Rows carrying the soft-delete flag.
  pub fn deletes(&self) -> usize {
    self.deletes
  }

  pub fn min_position(&self) -> Lsn {
    self.min_position
  }

  pub fn max_position(&self) -> Lsn {
    self.max_position
  }

  /// Newline-delimited JSON body, one row per line (ClickHouse
  /// `JSONEachRow`).
  pub fn to_json_each_row(&self) -> anyhow::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(self.rows.len() * 128);
    for row in &self.rows {
      serde_json::to_writer(&mut body, &row.data)?;
      body.push(b'\n');
    }
    Ok(body)
  }
}

impl Default for RowBatch {
  fn default() -> Self {
    Self::new()
  }
}
