// SPDX-License-Identifier: MIT

//! Presentation of the final submission

use std::io::Write;

use super::state::FieldMap;
use crate::error::WizardError;

/// Receives the final field values on submit
pub trait SubmissionSink {
    fn present(&mut self, fields: &FieldMap) -> Result<(), WizardError>;
}

/// Writes submitted fields as pretty-printed JSON
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SubmissionSink for JsonSink<W> {
    fn present(&mut self, fields: &FieldMap) -> Result<(), WizardError> {
        serde_json::to_writer_pretty(&mut self.writer, fields)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every submission in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub submissions: Vec<FieldMap>,
}

impl SubmissionSink for CollectingSink {
    fn present(&mut self, fields: &FieldMap) -> Result<(), WizardError> {
        self.submissions.push(fields.clone());
        Ok(())
    }
}
