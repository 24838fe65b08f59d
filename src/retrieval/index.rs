//! Exhaustive nearest-neighbour search.

use crate::error::RetrievalError;

/// One search result: the vector's insertion position and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: usize,
    pub distance: f32,
}

/// Vector index seam. Ids are insertion positions.
pub trait VectorStore: Send + Sync {
    /// Vector width, once anything has been added.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors. All must share the index dimension.
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), RetrievalError>;

    /// Up to `k` nearest vectors, closest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RetrievalError>;
}

/// Flat index ranked by squared L2 distance. Ties keep insertion order.
#[derive(Debug, Default)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimension(&self, actual: usize) -> Result<(), RetrievalError> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(RetrievalError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorStore for FlatL2Index {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), RetrievalError> {
        // Validate the whole batch first so a bad vector leaves the index untouched.
        let dimension = match (self.dimension, vectors.first()) {
            (Some(d), _) => d,
            (None, Some(first)) => first.len(),
            (None, None) => return Ok(()),
        };
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }
        self.dimension = Some(dimension);
        self.vectors.extend(vectors);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| SearchHit {
                id,
                distance: squared_l2(v, query),
            })
            .collect();
        // Stable sort keeps insertion order between equal distances.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}
