use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: DumpParseErrorKind,
    },

    #[error("Frame at timestep {timestep} is missing columns {missing:?}")]
    MissingColumns { timestep: u64, missing: Vec<String> },

    #[error("Frame at timestep {timestep} has {found} atoms, the first frame has {expected}")]
    AtomCountMismatch {
        timestep: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum DumpParseErrorKind {
    #[error("expected '{expected}', found '{found}'")]
    UnexpectedItem {
        expected: &'static str,
        found: String,
    },
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("invalid integer '{0}'")]
    InvalidInt(String),
    #[error("invalid number '{0}'")]
    InvalidFloat(String),
    #[error("expected {expected} values, found {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// One snapshot of a LAMMPS text dump.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpFrame {
    pub timestep: u64,
    pub box_bounds: [[f64; 2]; 3],
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DumpFrame {
    pub fn num_atoms(&self) -> usize {
        self.rows.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of `name` in atom-id order (file order when there is no `id` column).
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(self.row_order().into_iter().map(|r| self.rows[r][index]).collect())
    }

    fn row_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        if let Some(id) = self.column_index("id") {
            order.sort_by(|&a, &b| self.rows[a][id].total_cmp(&self.rows[b][id]));
        }
        order
    }

    fn vectors(&self, names: [&str; 3]) -> Result<Vec<Vector3<f64>>, DumpError> {
        let indices: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let missing: Vec<String> = names
            .iter()
            .zip(&indices)
            .filter(|(_, i)| i.is_none())
            .map(|(n, _)| n.to_string())
            .collect();
        let [Some(a), Some(b), Some(c)] = indices[..] else {
            return Err(DumpError::MissingColumns {
                timestep: self.timestep,
                missing,
            });
        };
        Ok(self
            .row_order()
            .into_iter()
            .map(|r| {
                let row = &self.rows[r];
                Vector3::new(row[a], row[b], row[c])
            })
            .collect())
    }

    pub fn positions(&self) -> Result<Vec<Point3<f64>>, DumpError> {
        Ok(self
            .vectors(["x", "y", "z"])?
            .into_iter()
            .map(Point3::from)
            .collect())
    }

    pub fn velocities(&self) -> Result<Vec<Vector3<f64>>, DumpError> {
        self.vectors(["vx", "vy", "vz"])
    }

    /// Distance of every atom from the origin.
    pub fn radial_distances(&self) -> Result<Vec<f64>, DumpError> {
        Ok(self
            .positions()?
            .iter()
            .map(|p| p.coords.norm())
            .collect())
    }

    pub fn speeds(&self) -> Result<Vec<f64>, DumpError> {
        Ok(self.velocities()?.iter().map(|v| v.norm()).collect())
    }
}

struct Lines<R> {
    inner: io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn next_raw(&mut self) -> Result<Option<String>, DumpError> {
        match self.inner.next() {
            Some(line) => {
                self.line += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn next_required(&mut self) -> Result<String, DumpError> {
        self.next_raw()?.ok_or(DumpError::Parse {
            line: self.line + 1,
            kind: DumpParseErrorKind::UnexpectedEof,
        })
    }

    fn expect_item(&mut self, expected: &'static str) -> Result<String, DumpError> {
        let line = self.next_required()?;
        if line.trim_start().starts_with(expected) {
            Ok(line)
        } else {
            Err(self.error(DumpParseErrorKind::UnexpectedItem {
                expected,
                found: line.trim().to_string(),
            }))
        }
    }

    fn error(&self, kind: DumpParseErrorKind) -> DumpError {
        DumpError::Parse {
            line: self.line,
            kind,
        }
    }

    fn parse_floats(&self, text: &str, expected: usize) -> Result<Vec<f64>, DumpError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < expected {
            return Err(self.error(DumpParseErrorKind::ColumnCount {
                expected,
                found: tokens.len(),
            }));
        }
        tokens
            .iter()
            .take(expected)
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| self.error(DumpParseErrorKind::InvalidFloat(t.to_string())))
            })
            .collect()
    }

    fn parse_count<T: std::str::FromStr>(&mut self) -> Result<T, DumpError> {
        let line = self.next_required()?;
        line.trim()
            .parse()
            .map_err(|_| self.error(DumpParseErrorKind::InvalidInt(line.trim().to_string())))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DumpFile {
    frames: Vec<DumpFrame>,
}

impl DumpFile {
    pub fn read_from(reader: impl BufRead) -> Result<Self, DumpError> {
        let mut lines = Lines {
            inner: reader.lines(),
            line: 0,
        };
        let mut frames = Vec::new();

        loop {
            let first = loop {
                match lines.next_raw()? {
                    Some(l) if l.trim().is_empty() => continue,
                    other => break other,
                }
            };
            let Some(first) = first else { break };
            if !first.trim_start().starts_with("ITEM: TIMESTEP") {
                return Err(lines.error(DumpParseErrorKind::UnexpectedItem {
                    expected: "ITEM: TIMESTEP",
                    found: first.trim().to_string(),
                }));
            }
            let timestep: u64 = lines.parse_count()?;

            lines.expect_item("ITEM: NUMBER OF ATOMS")?;
            let num_atoms: usize = lines.parse_count()?;

            lines.expect_item("ITEM: BOX BOUNDS")?;
            let mut box_bounds = [[0.0; 2]; 3];
            for bounds in &mut box_bounds {
                let line = lines.next_required()?;
                let values = lines.parse_floats(&line, 2)?;
                *bounds = [values[0], values[1]];
            }

            let header = lines.expect_item("ITEM: ATOMS")?;
            let columns: Vec<String> = header
                .trim_start()
                .trim_start_matches("ITEM: ATOMS")
                .split_whitespace()
                .map(str::to_string)
                .collect();

            let mut rows = Vec::new();
            for _ in 0..num_atoms {
                let line = lines.next_required()?;
                let found = line.split_whitespace().count();
                if found != columns.len() {
                    return Err(lines.error(DumpParseErrorKind::ColumnCount {
                        expected: columns.len(),
                        found,
                    }));
                }
                rows.push(lines.parse_floats(&line, columns.len())?);
            }

            debug!("Read dump frame at timestep {} ({} atoms)", timestep, num_atoms);
            frames.push(DumpFrame {
                timestep,
                box_bounds,
                columns,
                rows,
            });
        }

        Ok(Self { frames })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DumpError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn frames(&self) -> &[DumpFrame] {
        &self.frames
    }

    /// Mean-squared displacement of each frame relative to the first, averaged over
    /// atoms matched by id.
    pub fn mean_squared_displacement(&self) -> Result<Vec<f64>, DumpError> {
        let Some(first) = self.frames.first() else {
            return Ok(Vec::new());
        };
        let origin = first.positions()?;

        self.frames
            .iter()
            .map(|frame| {
                let positions = frame.positions()?;
                if positions.len() != origin.len() {
                    return Err(DumpError::AtomCountMismatch {
                        timestep: frame.timestep,
                        expected: origin.len(),
                        found: positions.len(),
                    });
                }
                if positions.is_empty() {
                    return Ok(0.0);
                }
                let total: f64 = positions
                    .iter()
                    .zip(&origin)
                    .map(|(p, p0)| (p - p0).norm_squared())
                    .sum();
                Ok(total / positions.len() as f64)
            })
            .collect()
    }

    /// Diffusion estimate `MSD / (6 t)` per frame, with `t` the elapsed time since the
    /// first frame (`dt` per step). The first frame has no elapsed time and reports 0.
    pub fn diffusion_coefficients(&self, dt: f64) -> Result<Vec<f64>, DumpError> {
        let Some(first) = self.frames.first() else {
            return Ok(Vec::new());
        };
        let msd = self.mean_squared_displacement()?;

        Ok(self
            .frames
            .iter()
            .zip(msd)
            .map(|(frame, msd)| {
                let elapsed = frame.timestep.saturating_sub(first.timestep) as f64 * dt;
                if elapsed > 0.0 {
                    msd / (6.0 * elapsed)
                } else {
                    0.0
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(timestep: u64, atoms: &[(u32, [f64; 3], [f64; 3])]) -> String {
        let mut text = format!(
            "ITEM: TIMESTEP\n{}\nITEM: NUMBER OF ATOMS\n{}\nITEM: BOX BOUNDS pp pp pp\n0 10\n0 10\n0 10\nITEM: ATOMS id type x y z vx vy vz\n",
            timestep,
            atoms.len()
        );
        for (id, r, v) in atoms {
            text.push_str(&format!(
                "{} 1 {} {} {} {} {} {}\n",
                id, r[0], r[1], r[2], v[0], v[1], v[2]
            ));
        }
        text
    }

    #[test]
    fn reads_consecutive_frames() {
        let text = format!(
            "{}{}",
            frame(0, &[(1, [3.0, 4.0, 0.0], [1.0, 0.0, 0.0])]),
            frame(100, &[(1, [3.0, 4.0, 1.0], [0.0, 2.0, 0.0])])
        );
        let dump = DumpFile::read_from(Cursor::new(text)).unwrap();
        assert_eq!(dump.frames().len(), 2);
        assert_eq!(dump.frames()[1].timestep, 100);
        assert_eq!(dump.frames()[0].box_bounds, [[0.0, 10.0]; 3]);
        assert_eq!(dump.frames()[0].radial_distances().unwrap(), vec![5.0]);
        assert_eq!(dump.frames()[1].speeds().unwrap(), vec![2.0]);
    }

    #[test]
    fn msd_matches_atoms_by_id() {
        let text = format!(
            "{}{}",
            frame(
                0,
                &[(1, [0.0, 0.0, 0.0], [0.0; 3]), (2, [5.0, 0.0, 0.0], [0.0; 3])]
            ),
            frame(
                10,
                &[(2, [5.0, 0.0, 2.0], [0.0; 3]), (1, [1.0, 0.0, 0.0], [0.0; 3])]
            )
        );
        let dump = DumpFile::read_from(Cursor::new(text)).unwrap();
        assert_eq!(dump.mean_squared_displacement().unwrap(), vec![0.0, 2.5]);
    }

    #[test]
    fn missing_velocity_columns_are_reported() {
        let text = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n1\nITEM: BOX BOUNDS pp pp pp\n0 1\n0 1\n0 1\nITEM: ATOMS id x y z\n1 0 0 0\n";
        let dump = DumpFile::read_from(Cursor::new(text)).unwrap();
        match dump.frames()[0].speeds() {
            Err(DumpError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["vx", "vy", "vz"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let text = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n2\nITEM: BOX BOUNDS pp pp pp\n0 1\n0 1\n0 1\nITEM: ATOMS id x y z\n1 0 0 0\n";
        assert!(matches!(
            DumpFile::read_from(Cursor::new(text)),
            Err(DumpError::Parse {
                kind: DumpParseErrorKind::UnexpectedEof,
                ..
            })
        ));
    }

    #[test]
    fn absurd_atom_count_is_reported_as_truncation() {
        let text = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n18446744073709551615\nITEM: BOX BOUNDS pp pp pp\n0 1\n0 1\n0 1\nITEM: ATOMS id x y z\n1 0 0 0\n";
        match DumpFile::read_from(Cursor::new(text)) {
            Err(DumpError::Parse { line, kind }) => {
                assert_eq!(line, 11);
                assert!(matches!(kind, DumpParseErrorKind::UnexpectedEof));
            }
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn diffusion_divides_msd_by_six_times_elapsed_time() {
        let text = format!(
            "{}{}{}",
            frame(100, &[(1, [0.0, 0.0, 0.0], [0.0; 3])]),
            frame(200, &[(1, [0.0, 0.0, 3.0], [0.0; 3])]),
            frame(300, &[(1, [0.0, 6.0, 0.0], [0.0; 3])])
        );
        let dump = DumpFile::read_from(Cursor::new(text)).unwrap();
        assert_eq!(
            dump.diffusion_coefficients(0.5).unwrap(),
            vec![0.0, 9.0 / 300.0, 36.0 / 600.0]
        );
    }

    #[test]
    fn unexpected_item_reports_its_line() {
        let text = "ITEM: TIMESTEP\n0\nITEM: BOX BOUNDS pp pp pp\n";
        match DumpFile::read_from(Cursor::new(text)) {
            Err(DumpError::Parse { line, kind }) => {
                assert_eq!(line, 3);
                assert!(matches!(kind, DumpParseErrorKind::UnexpectedItem { .. }));
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }
}
