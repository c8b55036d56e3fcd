//! Plan execution.
//!
//! Every source table is decoded from disk, the decoded tables are combined
//! as a cartesian product with the first table outermost, the filter is
//! applied to each combination and the survivors are projected. Storage
//! order is preserved throughout.

use pdx_storage::{Catalog, FieldValue, Row};
use serde::Serialize;
use tracing::{debug, trace};

use super::evaluator::{evaluate, evaluate_predicate, EvalError};
use crate::error::{Error, Result};
use crate::parser::Statement;
use crate::planner::{self, OutputColumn, SelectPlan};

/// Rows produced by a query, with their column descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column descriptors.
    pub columns: Vec<OutputColumn>,
    /// Result rows, one value per column.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display names of the columns.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Finds a column by display name, then by source field name, ignoring
    /// case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .or_else(|| self.columns.iter().position(|c| c.is_named(name)))
    }

    /// Value of column `name` in row `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<&FieldValue> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column)
    }
}

/// Runs a resolved plan.
pub fn execute(plan: &SelectPlan, catalog: &Catalog) -> Result<QueryResult> {
    let tables = plan
        .sources
        .iter()
        .map(|source| {
            let rows = catalog.load_fields(&source.table, &source.fields)?;
            debug!(
                table = source.table.name(),
                fields = source.fields.len(),
                rows = rows.len(),
                "decoded source"
            );
            Ok(rows)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    let mut combinations = 0usize;
    for_each_combination(&tables, |combined| {
        combinations += 1;
        if let Some(filter) = &plan.filter {
            if !evaluate_predicate(filter, combined)? {
                return Ok(());
            }
        }
        let values = plan
            .projections
            .iter()
            .map(|expr| evaluate(expr, combined))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.push(Row::new(values));
        Ok(())
    })?;

    trace!(combinations, rows = rows.len(), "executed select");
    Ok(QueryResult {
        columns: plan.columns.clone(),
        rows,
    })
}

/// Plans and runs one statement. Only SELECT can run.
pub fn plan_and_execute(statement: &Statement, catalog: &Catalog) -> Result<QueryResult> {
    match statement {
        Statement::Select(select) => {
            let plan = planner::plan(select, catalog)?;
            execute(&plan, catalog)
        }
        Statement::Other(other) => Err(Error::NotASelect {
            kind: other.kind.clone(),
        }),
    }
}

/// Calls `f` with every combination of one row per table, varying the last
/// table fastest. Nothing is called if any table is empty.
fn for_each_combination<F>(tables: &[Vec<Row>], mut f: F) -> std::result::Result<(), EvalError>
where
    F: FnMut(&[&Row]) -> std::result::Result<(), EvalError>,
{
    if tables.is_empty() || tables.iter().any(Vec::is_empty) {
        return Ok(());
    }

    let mut indices = vec![0usize; tables.len()];
    let mut combined: Vec<&Row> = tables.iter().map(|rows| &rows[0]).collect();
    loop {
        f(&combined)?;

        let mut table = tables.len();
        loop {
            if table == 0 {
                return Ok(());
            }
            table -= 1;
            indices[table] += 1;
            if indices[table] < tables[table].len() {
                combined[table] = &tables[table][indices[table]];
                break;
            }
            indices[table] = 0;
            combined[table] = &tables[table][0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: &[i32]) -> Vec<Row> {
        values
            .iter()
            .map(|v| Row::new(vec![FieldValue::Long(*v)]))
            .collect()
    }

    fn combinations(tables: &[Vec<Row>]) -> Vec<Vec<i64>> {
        let mut seen = Vec::new();
        for_each_combination(tables, |rows| {
            seen.push(
                rows.iter()
                    .map(|r| r.get(0).and_then(FieldValue::to_i64).unwrap_or(-1))
                    .collect(),
            );
            Ok(())
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_first_table_outermost() {
        let tables = [table(&[1, 2]), table(&[10, 20, 30])];
        assert_eq!(
            combinations(&tables),
            vec![
                vec![1, 10],
                vec![1, 20],
                vec![1, 30],
                vec![2, 10],
                vec![2, 20],
                vec![2, 30],
            ]
        );
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(combinations(&[table(&[5, 6])]), vec![vec![5], vec![6]]);
        assert!(combinations(&[table(&[1]), table(&[])]).is_empty());
    }

    #[test]
    fn test_query_result_lookup() {
        use pdx_storage::DataType;

        let result = QueryResult {
            columns: vec![
                OutputColumn {
                    name: "ACode".into(),
                    alias: Some("ACode".into()),
                    table: Some("AREACODES".into()),
                    field: Some("AC".into()),
                    data_type: DataType::Varchar,
                },
                OutputColumn {
                    name: "State".into(),
                    alias: None,
                    table: Some("AREACODES".into()),
                    field: Some("State".into()),
                    data_type: DataType::Varchar,
                },
            ],
            rows: vec![Row::new(vec![FieldValue::text("201"), FieldValue::text("NJ")])],
        };
        assert_eq!(result.column_index("acode"), Some(0));
        assert_eq!(result.column_index("AC"), Some(0));
        assert_eq!(result.column_index("STATE"), Some(1));
        assert_eq!(result.column_index("cities"), None);
        assert_eq!(result.value(0, "state"), Some(&FieldValue::text("NJ")));
        assert_eq!(result.value(1, "state"), None);
        assert_eq!(result.column_names(), ["ACode", "State"]);
        assert_eq!(result.len(), 1);
    }
}
