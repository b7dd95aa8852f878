//! Form tree reconciliation.
//!
//! A submitted [`FormInput`] is synchronized against the persisted tree one
//! level at a time: persisted children whose id is absent from the
//! submission are deleted (with their subtree), children carrying a known id
//! are updated in place, children without an id are inserted. Every id is
//! checked against the persisted tree before the first write, so a bad id
//! leaves storage untouched.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::database::form_store::FormStore;
use crate::database::manager::DatabaseError;
use crate::database::models::form::{
    ColumnInput, ColumnTree, Field, FieldInput, Form, FormInput, FormTree, RowInput, RowTree, SectionInput, SectionTree,
};
use crate::services::validation::{validate_form, FieldErrors};
use crate::types::{NodeKind, Operation};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid form definition")]
    Validation(FieldErrors),

    #[error("Form {0} not found")]
    FormNotFound(i64),

    #[error("{kind} {id} not found in {}", parent_label(.parent_kind, .parent_id))]
    UnknownNode {
        kind: NodeKind,
        id: i64,
        parent_kind: NodeKind,
        /// `None` when the parent is inserted by the same submission
        parent_id: Option<i64>,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// One write performed during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: NodeKind,
    pub id: i64,
    pub operation: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub changes: Vec<Change>,
}

impl ReconcileReport {
    fn record(&mut self, kind: NodeKind, id: i64, operation: Operation) {
        self.changes.push(Change { kind, id, operation });
    }

    pub fn count(&self, kind: NodeKind, operation: Operation) -> usize {
        self.changes
            .iter()
            .filter(|c| c.kind == kind && c.operation == operation)
            .count()
    }

    pub fn total(&self, operation: Operation) -> usize {
        self.changes.iter().filter(|c| c.operation == operation).count()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub tree: FormTree,
    pub report: ReconcileReport,
}

pub struct FormService {
    store: Arc<dyn FormStore>,
}

impl FormService {
    pub fn new(store: Arc<dyn FormStore>) -> Self {
        Self { store }
    }

    /// Every form that has not been soft-deleted, as full trees
    pub async fn list(&self) -> Result<Vec<FormTree>, ReconcileError> {
        let forms = self.store.list_forms(false).await?;
        let mut trees = Vec::with_capacity(forms.len());
        for form in forms {
            trees.push(self.load_tree(form).await?);
        }
        Ok(trees)
    }

    /// Direct lookup; soft-deleted forms are still returned
    pub async fn load(&self, form_id: i64) -> Result<FormTree, ReconcileError> {
        let form = self
            .store
            .get_form(form_id)
            .await?
            .ok_or(ReconcileError::FormNotFound(form_id))?;
        Ok(self.load_tree(form).await?)
    }

    /// Insert a new form with its whole tree; ids in the submission are ignored
    pub async fn create(&self, input: &FormInput) -> Result<Reconciled, ReconcileError> {
        validate_form(input).map_err(ReconcileError::Validation)?;

        let mut report = ReconcileReport::default();
        let form = self.store.insert_form(&input.attrs).await?;
        report.record(NodeKind::Form, form.id, Operation::Create);

        self.sync_sections(form.id, &[], &input.sections, &mut report).await?;

        info!(
            form_id = form.id,
            created = report.total(Operation::Create),
            "form created"
        );
        let tree = self.load(form.id).await?;
        Ok(Reconciled { tree, report })
    }

    /// Synchronize the persisted tree of `form_id` with `input`
    pub async fn update(&self, form_id: i64, input: &FormInput) -> Result<Reconciled, ReconcileError> {
        let persisted = self.load(form_id).await?;
        validate_form(input).map_err(ReconcileError::Validation)?;
        check_ownership(&persisted, input)?;

        let mut report = ReconcileReport::default();
        if persisted.form.attrs != input.attrs {
            if !self.store.update_form(form_id, &input.attrs).await? {
                return Err(ReconcileError::FormNotFound(form_id));
            }
            report.record(NodeKind::Form, form_id, Operation::Update);
        }

        self.sync_sections(form_id, &persisted.sections, &input.sections, &mut report)
            .await?;

        info!(
            form_id,
            created = report.total(Operation::Create),
            updated = report.total(Operation::Update),
            deleted = report.total(Operation::Delete),
            "form reconciled"
        );
        let tree = self.load(form_id).await?;
        Ok(Reconciled { tree, report })
    }

    pub async fn soft_delete(&self, form_id: i64) -> Result<(), ReconcileError> {
        if !self.store.soft_delete_form(form_id).await? {
            return Err(ReconcileError::FormNotFound(form_id));
        }
        info!(form_id, "form soft-deleted");
        Ok(())
    }

    async fn load_tree(&self, form: Form) -> Result<FormTree, DatabaseError> {
        let mut sections = Vec::new();
        for section in self.store.list_sections(form.id).await? {
            let mut rows = Vec::new();
            for row in self.store.list_rows(section.id).await? {
                let mut columns = Vec::new();
                for column in self.store.list_columns(row.id).await? {
                    let fields = self.store.list_fields(column.id).await?;
                    columns.push(ColumnTree { column, fields });
                }
                rows.push(RowTree { row, columns });
            }
            sections.push(SectionTree { section, rows });
        }
        Ok(FormTree { form, sections })
    }

    async fn sync_sections(
        &self,
        form_id: i64,
        persisted: &[SectionTree],
        inputs: &[SectionInput],
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let keep: HashSet<i64> = inputs.iter().filter_map(|s| s.id).collect();
        for orphan in persisted.iter().filter(|s| !keep.contains(&s.section.id)) {
            self.store.delete_section(orphan.section.id).await?;
            report.record(NodeKind::Section, orphan.section.id, Operation::Delete);
        }

        for input in inputs {
            match input.id.and_then(|id| persisted.iter().find(|s| s.section.id == id)) {
                Some(existing) => {
                    let id = existing.section.id;
                    if existing.section.attrs != input.attrs {
                        if !self.store.update_section(id, &input.attrs).await? {
                            return Err(unknown(NodeKind::Section, id, NodeKind::Form, Some(form_id)));
                        }
                        report.record(NodeKind::Section, id, Operation::Update);
                    }
                    self.sync_rows(id, &existing.rows, &input.rows, report).await?;
                }
                None => {
                    let section = self.store.insert_section(form_id, &input.attrs).await?;
                    report.record(NodeKind::Section, section.id, Operation::Create);
                    self.sync_rows(section.id, &[], &input.rows, report).await?;
                }
            }
        }
        Ok(())
    }

    async fn sync_rows(
        &self,
        section_id: i64,
        persisted: &[RowTree],
        inputs: &[RowInput],
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let keep: HashSet<i64> = inputs.iter().filter_map(|r| r.id).collect();
        for orphan in persisted.iter().filter(|r| !keep.contains(&r.row.id)) {
            self.store.delete_row(orphan.row.id).await?;
            report.record(NodeKind::Row, orphan.row.id, Operation::Delete);
        }

        for input in inputs {
            match input.id.and_then(|id| persisted.iter().find(|r| r.row.id == id)) {
                Some(existing) => {
                    let id = existing.row.id;
                    if existing.row.attrs != input.attrs {
                        if !self.store.update_row(id, &input.attrs).await? {
                            return Err(unknown(NodeKind::Row, id, NodeKind::Section, Some(section_id)));
                        }
                        report.record(NodeKind::Row, id, Operation::Update);
                    }
                    self.sync_columns(id, &existing.columns, &input.columns, report).await?;
                }
                None => {
                    let row = self.store.insert_row(section_id, &input.attrs).await?;
                    report.record(NodeKind::Row, row.id, Operation::Create);
                    self.sync_columns(row.id, &[], &input.columns, report).await?;
                }
            }
        }
        Ok(())
    }

    async fn sync_columns(
        &self,
        row_id: i64,
        persisted: &[ColumnTree],
        inputs: &[ColumnInput],
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let keep: HashSet<i64> = inputs.iter().filter_map(|c| c.id).collect();
        for orphan in persisted.iter().filter(|c| !keep.contains(&c.column.id)) {
            self.store.delete_column(orphan.column.id).await?;
            report.record(NodeKind::Column, orphan.column.id, Operation::Delete);
        }

        for input in inputs {
            match input.id.and_then(|id| persisted.iter().find(|c| c.column.id == id)) {
                Some(existing) => {
                    let id = existing.column.id;
                    if existing.column.attrs != input.attrs {
                        if !self.store.update_column(id, &input.attrs).await? {
                            return Err(unknown(NodeKind::Column, id, NodeKind::Row, Some(row_id)));
                        }
                        report.record(NodeKind::Column, id, Operation::Update);
                    }
                    self.sync_fields(id, &existing.fields, &input.fields, report).await?;
                }
                None => {
                    let column = self.store.insert_column(row_id, &input.attrs).await?;
                    report.record(NodeKind::Column, column.id, Operation::Create);
                    self.sync_fields(column.id, &[], &input.fields, report).await?;
                }
            }
        }
        Ok(())
    }

    async fn sync_fields(
        &self,
        column_id: i64,
        persisted: &[Field],
        inputs: &[FieldInput],
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let keep: HashSet<i64> = inputs.iter().filter_map(|f| f.id).collect();
        for orphan in persisted.iter().filter(|f| !keep.contains(&f.id)) {
            self.store.delete_field(orphan.id).await?;
            report.record(NodeKind::Field, orphan.id, Operation::Delete);
        }

        for input in inputs {
            match input.id.and_then(|id| persisted.iter().find(|f| f.id == id)) {
                Some(existing) => {
                    if existing.attrs != input.attrs {
                        if !self.store.update_field(existing.id, &input.attrs).await? {
                            return Err(unknown(NodeKind::Field, existing.id, NodeKind::Column, Some(column_id)));
                        }
                        report.record(NodeKind::Field, existing.id, Operation::Update);
                    }
                }
                None => {
                    let field = self.store.insert_field(column_id, &input.attrs).await?;
                    report.record(NodeKind::Field, field.id, Operation::Create);
                }
            }
        }
        Ok(())
    }
}

fn parent_label(kind: &NodeKind, id: &Option<i64>) -> String {
    match id {
        Some(id) => format!("{} {}", kind, id),
        None => format!("new {}", kind),
    }
}

fn unknown(kind: NodeKind, id: i64, parent_kind: NodeKind, parent_id: Option<i64>) -> ReconcileError {
    ReconcileError::UnknownNode {
        kind,
        id,
        parent_kind,
        parent_id,
    }
}

/// Every submitted id must name a persisted child of the node it is nested
/// under; children of newly inserted nodes therefore cannot carry ids.
pub fn check_ownership(persisted: &FormTree, input: &FormInput) -> Result<(), ReconcileError> {
    let form_id = persisted.form.id;
    for section in &input.sections {
        let existing = match section.id {
            Some(id) => Some(
                persisted
                    .sections
                    .iter()
                    .find(|s| s.section.id == id)
                    .ok_or_else(|| unknown(NodeKind::Section, id, NodeKind::Form, Some(form_id)))?,
            ),
            None => None,
        };
        let rows = existing.map(|s| s.rows.as_slice()).unwrap_or(&[]);
        let parent = existing.map(|s| s.section.id);

        for row in &section.rows {
            let existing = match row.id {
                Some(id) => Some(
                    rows.iter()
                        .find(|r| r.row.id == id)
                        .ok_or_else(|| unknown(NodeKind::Row, id, NodeKind::Section, parent))?,
                ),
                None => None,
            };
            let columns = existing.map(|r| r.columns.as_slice()).unwrap_or(&[]);
            let parent = existing.map(|r| r.row.id);

            for column in &row.columns {
                let existing = match column.id {
                    Some(id) => Some(
                        columns
                            .iter()
                            .find(|c| c.column.id == id)
                            .ok_or_else(|| unknown(NodeKind::Column, id, NodeKind::Row, parent))?,
                    ),
                    None => None,
                };
                let fields = existing.map(|c| c.fields.as_slice()).unwrap_or(&[]);
                let parent = existing.map(|c| c.column.id);

                for field in &column.fields {
                    if let Some(id) = field.id {
                        if !fields.iter().any(|f| f.id == id) {
                            return Err(unknown(NodeKind::Field, id, NodeKind::Column, parent));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
