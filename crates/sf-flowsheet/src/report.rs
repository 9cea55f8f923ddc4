//! Stream table for display after a solve.

use std::fmt;

/// One stream as read from its producing outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRow {
    pub name: String,
    pub recycle: bool,
    /// Solvent flow.
    pub flow: f64,
    /// Mass flow per solute, in [`StreamReport::solutes`] order.
    pub mass: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamReport {
    pub solutes: Vec<String>,
    pub flow_unit: &'static str,
    pub mass_unit: &'static str,
    pub rows: Vec<StreamRow>,
}

impl StreamReport {
    pub fn row(&self, name: &str) -> Option<&StreamRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Mass flow of `solute` in stream `name`.
    pub fn mass(&self, name: &str, solute: &str) -> Option<f64> {
        let j = self.solutes.iter().position(|s| s == solute)?;
        self.row(name)?.mass.get(j).copied()
    }
}

impl fmt::Display for StreamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.name.len() + usize::from(r.recycle) * 2)
            .max()
            .unwrap_or(0)
            .max("stream".len());

        write!(f, "{:<width$}  {:>14}", "stream", format!("flow [{}]", self.flow_unit))?;
        for j in &self.solutes {
            write!(f, "  {:>14}", format!("{j} [{}]", self.mass_unit))?;
        }
        writeln!(f)?;

        for row in &self.rows {
            let name = if row.recycle {
                format!("{} *", row.name)
            } else {
                row.name.clone()
            };
            write!(f, "{name:<width$}  {:>14.4}", row.flow)?;
            for m in &row.mass {
                write!(f, "  {m:>14.4}")?;
            }
            writeln!(f)?;
        }
        if self.rows.iter().any(|r| r.recycle) {
            writeln!(f, "(* recycle)")?;
        }
        Ok(())
    }
}
