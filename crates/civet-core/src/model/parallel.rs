//! Parallel job expansion specifications
//!
//! `parallel` may be a plain instance count or a matrix of variable-value
//! combinations. Expansion itself lives in the validator; this module only
//! models the specification.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Lowest accepted plain `parallel` count
pub const MIN_PARALLEL: u32 = 2;
/// Highest accepted plain `parallel` count
pub const MAX_PARALLEL: u32 = 200;

/// One variable axis of a matrix block, e.g. `PROVIDER: [aws, gcp]`
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixDimension {
    /// Variable name
    pub variable: String,
    /// Listed values, in declaration order
    pub values: Vec<String>,
}

impl MatrixDimension {
    /// Create a dimension from a variable name and its values
    pub fn new(variable: impl Into<String>, values: Vec<String>) -> Self {
        MatrixDimension {
            variable: variable.into(),
            values,
        }
    }
}

/// One matrix block: the cross-product of its dimensions
///
/// Dimension declaration order is significant: expansion is column-major, the
/// first listed dimension's values vary slowest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    pub dimensions: Vec<MatrixDimension>,
}

impl Matrix {
    /// Create a matrix block from its dimensions
    pub fn new(dimensions: Vec<MatrixDimension>) -> Self {
        Matrix { dimensions }
    }

    /// Number of combinations this block expands to
    pub fn combination_count(&self) -> usize {
        if self.dimensions.is_empty() {
            return 0;
        }
        self.dimensions.iter().map(|d| d.values.len()).product()
    }
}

/// Parallel specification: plain count or matrix blocks
#[derive(Debug, Clone, PartialEq)]
pub enum Parallel {
    /// `parallel: N` - N identical instances with an index suffix
    Count(u32),
    /// `parallel: {matrix: [...]}` - one instance per variable combination
    Matrix(Vec<Matrix>),
}

impl Parallel {
    /// Total number of job instances this specification produces
    pub fn instance_count(&self) -> usize {
        match self {
            Parallel::Count(n) => *n as usize,
            Parallel::Matrix(blocks) => blocks.iter().map(Matrix::combination_count).sum(),
        }
    }
}

// Serializes back to the document shape: a bare number for Count, a
// `{matrix: [{VAR: [..]}, ..]}` mapping for Matrix.
impl Serialize for Parallel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Parallel::Count(n) => serializer.serialize_u32(*n),
            Parallel::Matrix(blocks) => {
                let mut map = serializer.serialize_map(Some(1))?;
                let entries: Vec<_> = blocks.iter().map(MatrixEntry).collect();
                map.serialize_entry("matrix", &entries)?;
                map.end()
            }
        }
    }
}

struct MatrixEntry<'a>(&'a Matrix);

impl Serialize for MatrixEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.dimensions.len()))?;
        for dim in &self.0.dimensions {
            map.serialize_entry(&dim.variable, &dim.values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(name: &str, values: &[&str]) -> MatrixDimension {
        MatrixDimension::new(name, values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_combination_count() {
        let matrix = Matrix::new(vec![dim("A", &["1", "2"]), dim("B", &["x", "y", "z"])]);
        assert_eq!(matrix.combination_count(), 6);
        assert_eq!(Matrix::default().combination_count(), 0);
    }

    #[test]
    fn test_instance_count() {
        assert_eq!(Parallel::Count(5).instance_count(), 5);

        let parallel = Parallel::Matrix(vec![
            Matrix::new(vec![dim("A", &["1", "2"])]),
            Matrix::new(vec![dim("B", &["x"])]),
        ]);
        assert_eq!(parallel.instance_count(), 3);
    }

    #[test]
    fn test_serialize_count() {
        let value = serde_yaml::to_value(Parallel::Count(3)).unwrap();
        assert_eq!(value, serde_yaml::Value::Number(3.into()));
    }

    #[test]
    fn test_serialize_matrix_shape() {
        let parallel = Parallel::Matrix(vec![Matrix::new(vec![dim("A", &["1", "2"])])]);
        let value = serde_yaml::to_value(&parallel).unwrap();

        let matrix = value.get("matrix").and_then(|m| m.as_sequence()).unwrap();
        assert_eq!(matrix.len(), 1);
        let axis = matrix[0].get("A").and_then(|a| a.as_sequence()).unwrap();
        assert_eq!(axis.len(), 2);
    }
}
