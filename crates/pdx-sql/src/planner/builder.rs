//! Builds a [`SelectPlan`] from a parsed SELECT.

use std::collections::BTreeSet;

use pdx_storage::{Catalog, Field};
use tracing::debug;

use super::{BoundExpr, OutputColumn, PlanError, SelectPlan, TableSource};
use crate::error::Result;
use crate::parser::{BinaryOperator, ColumnRef, Expr, SelectItem, SelectStatement};

/// Resolves `select` against `catalog`.
///
/// Reads the headers of the tables named in FROM and nothing else.
pub fn plan(select: &SelectStatement, catalog: &Catalog) -> Result<SelectPlan> {
    let mut sources = Vec::with_capacity(select.from.len());
    for table_ref in &select.from {
        let table = catalog
            .find_table(&table_ref.name)?
            .ok_or_else(|| PlanError::TableNotFound {
                table: table_ref.name.clone(),
            })?;
        sources.push(TableSource {
            table,
            alias: table_ref.alias.clone(),
            fields: Vec::new(),
        });
    }

    let mut binder = Binder { sources };
    binder.select_fields(select)?;

    let mut columns = Vec::new();
    let mut projections = Vec::new();
    for item in &select.items {
        match item {
            SelectItem::Wildcard => {
                for source in 0..binder.sources.len() {
                    binder.expand(source, &mut columns, &mut projections);
                }
            }
            SelectItem::QualifiedWildcard(qualifier) => {
                for source in binder.qualified(qualifier)? {
                    binder.expand(source, &mut columns, &mut projections);
                }
            }
            SelectItem::Expr { expr, alias } => {
                let bound = binder.bind(expr)?;
                let (table, field) = match expr {
                    Expr::Column(column) => {
                        let (source, field) = binder.resolve(column)?;
                        (
                            Some(binder.sources[source].table.name().to_string()),
                            Some(field.name.clone()),
                        )
                    }
                    _ => (None, None),
                };
                let name = alias
                    .clone()
                    .or_else(|| field.clone())
                    .unwrap_or_else(|| expr.to_string());
                columns.push(OutputColumn {
                    name,
                    alias: alias.clone(),
                    table,
                    field,
                    data_type: bound.data_type(),
                });
                projections.push(bound);
            }
        }
    }

    let filter = select
        .selection
        .as_ref()
        .map(|expr| binder.bind(expr))
        .transpose()?;

    debug!(
        tables = binder.sources.len(),
        columns = columns.len(),
        filter = filter.is_some(),
        "planned select"
    );
    Ok(SelectPlan {
        columns,
        sources: binder.sources,
        projections,
        filter,
    })
}

struct Binder {
    sources: Vec<TableSource>,
}

impl Binder {
    /// Records which fields each source must decode.
    fn select_fields(&mut self, select: &SelectStatement) -> Result<(), PlanError> {
        let mut needed = vec![BTreeSet::new(); self.sources.len()];

        for item in &select.items {
            match item {
                SelectItem::Wildcard => {
                    for (source, positions) in self.sources.iter().zip(needed.iter_mut()) {
                        positions.extend(source.table.fields().iter().map(|f| f.position));
                    }
                }
                SelectItem::QualifiedWildcard(qualifier) => {
                    for source in self.qualified(qualifier)? {
                        let fields = self.sources[source].table.fields();
                        needed[source].extend(fields.iter().map(|f| f.position));
                    }
                }
                SelectItem::Expr { expr, .. } => self.mark(expr, &mut needed)?,
            }
        }
        if let Some(selection) = &select.selection {
            self.mark(selection, &mut needed)?;
        }

        for (source, positions) in self.sources.iter_mut().zip(needed) {
            source.fields = source
                .table
                .fields()
                .iter()
                .filter(|f| positions.contains(&f.position))
                .cloned()
                .collect();
        }
        Ok(())
    }

    fn mark(&self, expr: &Expr, needed: &mut [BTreeSet<usize>]) -> Result<(), PlanError> {
        let mut columns = Vec::new();
        expr.for_each_column(&mut |column| columns.push(column));
        for column in columns {
            let (source, field) = self.resolve(column)?;
            needed[source].insert(field.position);
        }
        Ok(())
    }

    /// Finds the one field a column reference names.
    fn resolve(&self, column: &ColumnRef) -> Result<(usize, &Field), PlanError> {
        let found: Vec<(usize, &Field)> = self
            .sources
            .iter()
            .enumerate()
            .filter(|(_, source)| {
                column
                    .qualifier
                    .as_deref()
                    .map_or(true, |q| source.matches(q))
            })
            .filter_map(|(i, source)| source.table.field(&column.name).map(|f| (i, f)))
            .collect();

        match found.as_slice() {
            [] => Err(PlanError::ColumnNotFound {
                column: column.to_string(),
            }),
            [one] => Ok(*one),
            many => Err(PlanError::AmbiguousColumn {
                column: column.to_string(),
                tables: many
                    .iter()
                    .map(|(i, _)| {
                        let source = &self.sources[*i];
                        source
                            .alias
                            .clone()
                            .unwrap_or_else(|| source.table.name().to_string())
                    })
                    .collect(),
            }),
        }
    }

    /// Sources a `qualifier.*` item expands.
    fn qualified(&self, qualifier: &str) -> Result<Vec<usize>, PlanError> {
        let matching: Vec<usize> = self
            .sources
            .iter()
            .enumerate()
            .filter(|(_, source)| source.matches(qualifier))
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return Err(PlanError::ColumnNotFound {
                column: format!("{}.*", qualifier),
            });
        }
        Ok(matching)
    }

    fn expand(&self, source: usize, columns: &mut Vec<OutputColumn>, projections: &mut Vec<BoundExpr>) {
        let table = &self.sources[source].table;
        for (index, field) in self.sources[source].fields.iter().enumerate() {
            columns.push(OutputColumn {
                name: field.name.clone(),
                alias: None,
                table: Some(table.name().to_string()),
                field: Some(field.name.clone()),
                data_type: field.data_type(),
            });
            projections.push(BoundExpr::Column {
                source,
                index,
                name: field.name.clone(),
                data_type: field.data_type(),
            });
        }
    }

    fn bind(&self, expr: &Expr) -> Result<BoundExpr, PlanError> {
        Ok(match expr {
            Expr::Column(column) => {
                let (source, field) = self.resolve(column)?;
                let index = self.sources[source]
                    .fields
                    .iter()
                    .position(|f| f.position == field.position)
                    .ok_or_else(|| PlanError::ColumnNotFound {
                        column: column.to_string(),
                    })?;
                BoundExpr::Column {
                    source,
                    index,
                    name: column.to_string(),
                    data_type: field.data_type(),
                }
            }
            Expr::Literal(literal) => BoundExpr::literal(literal),
            Expr::BinaryOp { left, op, right } => {
                let left = Box::new(self.bind(left)?);
                let right = Box::new(self.bind(right)?);
                match op {
                    BinaryOperator::And => BoundExpr::And(left, right),
                    BinaryOperator::Or => BoundExpr::Or(left, right),
                    op => BoundExpr::Compare {
                        left,
                        op: *op,
                        right,
                    },
                }
            }
            Expr::Not(expr) => BoundExpr::Not(Box::new(self.bind(expr)?)),
            Expr::Like {
                expr,
                pattern,
                negated,
            } => BoundExpr::Like {
                expr: Box::new(self.bind(expr)?),
                pattern: Box::new(self.bind(pattern)?),
                negated: *negated,
            },
            Expr::IsNull { expr, negated } => BoundExpr::IsNull {
                expr: Box::new(self.bind(expr)?),
                negated: *negated,
            },
            Expr::Nested(expr) => self.bind(expr)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::{Parser, Statement};
    use pdx_common::config::CatalogConfig;
    use pdx_storage::fixture::TableBuilder;
    use pdx_storage::{DataType, FieldType, FieldValue};

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        TableBuilder::new("customer")
            .field("CustNo", FieldType::Long, 4)
            .field("Name", FieldType::Alpha, 30)
            .field("Email", FieldType::Alpha, 40)
            .field("City", FieldType::Alpha, 20)
            .row(vec![
                FieldValue::Long(1221),
                FieldValue::text("Kauai Dive Shoppe"),
                FieldValue::Null,
                FieldValue::text("Kapaa Kauai"),
            ])
            .write(dir.path())
            .unwrap();
        TableBuilder::new("orders")
            .field("OrderNo", FieldType::Long, 4)
            .field("CustNo", FieldType::Long, 4)
            .field("Total", FieldType::Currency, 8)
            .write(dir.path())
            .unwrap();
        let catalog = Catalog::open(dir.path(), CatalogConfig::default()).unwrap();
        (dir, catalog)
    }

    fn plan_sql(catalog: &Catalog, sql: &str) -> Result<SelectPlan> {
        match Parser::parse(sql)?.remove(0) {
            Statement::Select(select) => plan(&select, catalog),
            Statement::Other(other) => panic!("not a select: {}", other.text),
        }
    }

    #[test]
    fn test_wildcard_expansion() {
        let (_dir, catalog) = catalog();
        let plan = plan_sql(&catalog, "SELECT * FROM customer, orders").unwrap();
        assert_eq!(
            plan.column_names(),
            ["CustNo", "Name", "Email", "City", "OrderNo", "CustNo", "Total"]
        );
        assert_eq!(plan.columns[6].data_type, DataType::Currency);
        assert_eq!(plan.columns[4].table.as_deref(), Some("orders"));
    }

    #[test]
    fn test_only_referenced_fields_decoded() {
        let (_dir, catalog) = catalog();
        let plan = plan_sql(&catalog, "SELECT city FROM customer WHERE Email IS NULL").unwrap();
        let fields: Vec<_> = plan.sources[0].fields.iter().map(|f| f.name.as_str()).collect();
        // record order, not reference order
        assert_eq!(fields, ["Email", "City"]);
        assert_eq!(
            plan.projections[0],
            BoundExpr::Column {
                source: 0,
                index: 1,
                name: "city".into(),
                data_type: DataType::Varchar,
            }
        );
    }

    #[test]
    fn test_display_names() {
        let (_dir, catalog) = catalog();
        let plan = plan_sql(
            &catalog,
            "SELECT name, EMAIL AS mail, 'x', c.CustNo = 1 FROM customer c",
        )
        .unwrap();
        assert_eq!(plan.column_names(), ["Name", "mail", "'x'", "c.CustNo = 1"]);
        assert_eq!(plan.columns[1].field.as_deref(), Some("Email"));
        assert_eq!(plan.columns[1].alias.as_deref(), Some("mail"));
        assert_eq!(plan.columns[3].data_type, DataType::Boolean);
        assert_eq!(plan.columns[2].table, None);
    }

    #[test]
    fn test_qualifiers() {
        let (_dir, catalog) = catalog();
        for sql in [
            "SELECT o.CustNo FROM customer c, orders o",
            "SELECT orders.CustNo FROM customer, orders",
            "SELECT \"orders.db\".CustNo FROM customer, \"orders.db\"",
        ] {
            let plan = plan_sql(&catalog, sql).unwrap();
            assert_eq!(plan.columns[0].table.as_deref(), Some("orders"), "{}", sql);
            assert!(plan.sources[0].fields.is_empty());
        }

        let plan = plan_sql(&catalog, "SELECT o.* FROM customer c, orders o").unwrap();
        assert_eq!(plan.column_names(), ["OrderNo", "CustNo", "Total"]);
    }

    #[test]
    fn test_resolution_errors() {
        let (_dir, catalog) = catalog();
        let err = plan_sql(&catalog, "SELECT * FROM not_found").unwrap_err();
        assert!(matches!(
            err,
            Error::Plan(PlanError::TableNotFound { ref table }) if table == "not_found"
        ));

        let err = plan_sql(&catalog, "SELECT Phone FROM customer").unwrap_err();
        assert!(matches!(err, Error::Plan(PlanError::ColumnNotFound { .. })));

        let err = plan_sql(&catalog, "SELECT CustNo FROM customer c, orders o").unwrap_err();
        match err {
            Error::Plan(PlanError::AmbiguousColumn { column, tables }) => {
                assert_eq!(column, "CustNo");
                assert_eq!(tables, ["c", "o"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = plan_sql(&catalog, "SELECT x.* FROM customer").unwrap_err();
        assert!(matches!(err, Error::Plan(PlanError::ColumnNotFound { ref column }) if column == "x.*"));

        let err = plan_sql(&catalog, "SELECT Name FROM customer WHERE o.Total > 1").unwrap_err();
        assert!(matches!(err, Error::Plan(PlanError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_plan_display() {
        let (_dir, catalog) = catalog();
        let plan = plan_sql(&catalog, "SELECT Name FROM customer WHERE CustNo > 1000").unwrap();
        let text = plan.to_string();
        assert!(text.contains("Project: Name"));
        assert!(text.contains("Filter: CustNo > 1000"));
        assert!(text.contains("Scan: customer [CustNo, Name]"));
    }
}
