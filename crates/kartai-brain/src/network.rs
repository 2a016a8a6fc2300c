//! Feed-forward networks used as kart drivers.
//!
//! The training loop is written against the [`Brain`] trait so that the
//! evolutionary algorithm does not depend on how a network is evaluated. The
//! crate ships one implementation, [`Perceptron`]: a fixed-topology two-layer
//! perceptron with tanh activations backed by flat row-major matrices.
//!
//! # Genetic Operators
//!
//! - **Mutation** - every scalar independently, with probability `rate`, gets a
//!   perturbation drawn uniformly from `[-0.25, 0.25]`
//! - **Crossover** - every scalar of the child is taken from either parent with
//!   probability 0.5
//!
//! Neither operator changes the topology. Crossing two networks of different
//! topologies is a caller error and panics.
//!
//! # Serialization
//!
//! Networks serialize to [`SerializedNetwork`], a JSON-friendly structure that
//! stores the weight matrices row by row (`weights1[input][hidden]`,
//! `weights2[hidden][output]`). A round trip reproduces bit-identical forward
//! outputs.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest absolute perturbation applied by mutation.
pub const MUTATION_STEP: f64 = 0.25;

/// Layer sizes of a two-layer perceptron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{input_size}/{hidden_size}/{output_size}")]
pub struct Topology {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl Topology {
    #[must_use]
    pub const fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size,
        }
    }

    /// Number of weights and biases in a network of this topology.
    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        (self.input_size + 1) * self.hidden_size + (self.hidden_size + 1) * self.output_size
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(10, 10, 3)
    }
}

/// Errors raised when rebuilding a network from serialized weights.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum NetworkError {
    #[display("network topology {_0} has an empty layer")]
    EmptyLayer(#[error(not(source))] Topology),
    #[display("{what} has {actual} values, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("network contains non-finite values")]
    NonFinite,
}

/// A network that can drive a kart and be evolved.
pub trait Brain: Clone + fmt::Debug + Send + Sync {
    /// Creates a network with every parameter drawn uniformly from `[-1, 1]`.
    fn random<R>(topology: Topology, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    fn topology(&self) -> Topology;

    /// Runs the network. `inputs` must have `topology().input_size` elements;
    /// the result has `topology().output_size` elements, each in `(-1, 1)`.
    fn forward(&self, inputs: &[f64]) -> Vec<f64>;

    /// Perturbs parameters in place, each with probability `rate`.
    fn mutate<R>(&mut self, rate: f64, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Builds a child by picking every parameter from either parent.
    ///
    /// # Panics
    ///
    /// Panics if the parents have different topologies.
    #[must_use]
    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    fn to_serialized(&self) -> SerializedNetwork;

    fn from_serialized(data: SerializedNetwork) -> Result<Self, NetworkError>;
}

/// Two-layer perceptron with tanh activations.
///
/// # Example
///
/// ```
/// use kartai_brain::network::{Brain, Perceptron, Topology};
///
/// let mut rng = rand::rng();
/// let net = Perceptron::random(Topology::new(3, 5, 2), &mut rng);
/// let outputs = net.forward(&[1.0, 2.0, 3.0]);
/// assert_eq!(outputs.len(), 2);
/// assert!(outputs.iter().all(|o| o.abs() < 1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Perceptron {
    topology: Topology,
    /// `input_size × hidden_size`, row-major.
    weights1: Vec<f64>,
    bias1: Vec<f64>,
    /// `hidden_size × output_size`, row-major.
    weights2: Vec<f64>,
    bias2: Vec<f64>,
}

impl Perceptron {
    /// Builds a network from explicit parameters, checking every dimension.
    pub fn from_parts(
        topology: Topology,
        weights1: Vec<f64>,
        bias1: Vec<f64>,
        weights2: Vec<f64>,
        bias2: Vec<f64>,
    ) -> Result<Self, NetworkError> {
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = topology;
        if input_size == 0 || hidden_size == 0 || output_size == 0 {
            return Err(NetworkError::EmptyLayer(topology));
        }
        check_len("weights1", input_size * hidden_size, weights1.len())?;
        check_len("bias1", hidden_size, bias1.len())?;
        check_len("weights2", hidden_size * output_size, weights2.len())?;
        check_len("bias2", output_size, bias2.len())?;

        let net = Self {
            topology,
            weights1,
            bias1,
            weights2,
            bias2,
        };
        if !net.parameters().all(f64::is_finite) {
            return Err(NetworkError::NonFinite);
        }
        Ok(net)
    }

    /// A network whose every parameter is zero; it outputs zeros for any input.
    #[must_use]
    pub fn zeroed(topology: Topology) -> Self {
        Self::filled(topology, |_| 0.0)
    }

    fn filled<F>(topology: Topology, mut f: F) -> Self
    where
        F: FnMut(usize) -> f64,
    {
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = topology;
        let mut index = 0;
        let mut values = |len: usize| {
            (0..len)
                .map(|_| {
                    let v = f(index);
                    index += 1;
                    v
                })
                .collect::<Vec<_>>()
        };
        let weights1 = values(input_size * hidden_size);
        let bias1 = values(hidden_size);
        let weights2 = values(hidden_size * output_size);
        let bias2 = values(output_size);
        Self {
            topology,
            weights1,
            bias1,
            weights2,
            bias2,
        }
    }

    /// Iterates over every weight and bias.
    pub fn parameters(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights1
            .iter()
            .chain(&self.bias1)
            .chain(&self.weights2)
            .chain(&self.bias2)
            .copied()
    }

    fn parameters_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.weights1
            .iter_mut()
            .chain(&mut self.bias1)
            .chain(&mut self.weights2)
            .chain(&mut self.bias2)
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), NetworkError> {
    if expected == actual {
        Ok(())
    } else {
        Err(NetworkError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// `tanh(inputs · weights + bias)` for a row-major `inputs.len() × bias.len()` matrix.
fn dense_tanh(inputs: &[f64], weights: &[f64], bias: &[f64]) -> Vec<f64> {
    let cols = bias.len();
    let mut sums = bias.to_vec();
    for (input, row) in inputs.iter().zip(weights.chunks_exact(cols)) {
        for (sum, w) in sums.iter_mut().zip(row) {
            *sum += input * w;
        }
    }
    sums.into_iter().map(f64::tanh).collect()
}

impl Brain for Perceptron {
    fn random<R>(topology: Topology, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::filled(topology, |_| rng.random_range(-1.0..=1.0))
    }

    fn topology(&self) -> Topology {
        self.topology
    }

    fn forward(&self, inputs: &[f64]) -> Vec<f64> {
        assert_eq!(
            inputs.len(),
            self.topology.input_size,
            "input vector does not match network topology {}",
            self.topology
        );
        let hidden = dense_tanh(inputs, &self.weights1, &self.bias1);
        dense_tanh(&hidden, &self.weights2, &self.bias2)
    }

    fn mutate<R>(&mut self, rate: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let rate = rate.clamp(0.0, 1.0);
        for value in self.parameters_mut() {
            if rng.random_bool(rate) {
                *value += rng.random_range(-MUTATION_STEP..=MUTATION_STEP);
            }
        }
    }

    fn crossover<R>(&self, other: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert_eq!(
            self.topology, other.topology,
            "crossover requires parents of identical topology"
        );
        let a = self.parameters().collect::<Vec<_>>();
        let b = other.parameters().collect::<Vec<_>>();
        Self::filled(self.topology, |i| {
            if rng.random_bool(0.5) { a[i] } else { b[i] }
        })
    }

    fn to_serialized(&self) -> SerializedNetwork {
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = self.topology;
        SerializedNetwork {
            input_size,
            hidden_size,
            output_size,
            weights1: self.weights1.chunks(hidden_size).map(<[f64]>::to_vec).collect(),
            weights2: self.weights2.chunks(output_size).map(<[f64]>::to_vec).collect(),
            bias1: self.bias1.clone(),
            bias2: self.bias2.clone(),
        }
    }

    fn from_serialized(data: SerializedNetwork) -> Result<Self, NetworkError> {
        let topology = Topology::new(data.input_size, data.hidden_size, data.output_size);
        check_len("weights1 rows", data.input_size, data.weights1.len())?;
        check_len("weights2 rows", data.hidden_size, data.weights2.len())?;
        for row in &data.weights1 {
            check_len("weights1 row", data.hidden_size, row.len())?;
        }
        for row in &data.weights2 {
            check_len("weights2 row", data.output_size, row.len())?;
        }
        Self::from_parts(
            topology,
            data.weights1.concat(),
            data.bias1,
            data.weights2.concat(),
            data.bias2,
        )
    }
}

/// JSON representation of a two-layer network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub weights1: Vec<Vec<f64>>,
    pub weights2: Vec<Vec<f64>>,
    pub bias1: Vec<f64>,
    pub bias2: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    #[test]
    fn test_forward_output_is_bounded() {
        let mut rng = rng();
        for topology in [Topology::new(1, 1, 1), Topology::new(3, 5, 2), Topology::default()] {
            for _ in 0..50 {
                let net = Perceptron::random(topology, &mut rng);
                let inputs = (0..topology.input_size)
                    .map(|_| rng.random_range(-1.0..=1.0))
                    .collect::<Vec<f64>>();
                let outputs = net.forward(&inputs);
                assert_eq!(outputs.len(), topology.output_size);
                assert!(outputs.iter().all(|o| *o > -1.0 && *o < 1.0), "{outputs:?}");
            }
        }
    }

    #[test]
    fn test_random_parameters_in_unit_range() {
        let net = Perceptron::random(Topology::default(), &mut rng());
        assert_eq!(net.parameters().count(), Topology::default().parameter_count());
        assert!(net.parameters().all(|p| (-1.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_hand_computed_forward() {
        let net = Perceptron::from_parts(
            Topology::new(1, 1, 1),
            vec![0.5],
            vec![0.1],
            vec![0.8],
            vec![-0.2],
        )
        .unwrap();
        let expected = f64::tanh(f64::tanh(0.5 * 1.0 + 0.1) * 0.8 - 0.2);
        assert_eq!(net.forward(&[1.0]), vec![expected]);
    }

    #[test]
    fn test_serialize_round_trip_reproduces_outputs() {
        let mut rng = rng();
        let net = Perceptron::random(Topology::default(), &mut rng);
        let json = serde_json::to_string(&net.to_serialized()).unwrap();
        let restored =
            Perceptron::from_serialized(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, net);

        let inputs = (0..10).map(|i| f64::from(i) / 10.0).collect::<Vec<_>>();
        assert_eq!(restored.forward(&inputs), net.forward(&inputs));
    }

    #[test]
    fn test_hand_written_json_round_trip() {
        let json = r#"{
            "input_size": 1, "hidden_size": 1, "output_size": 1,
            "weights1": [[0.5]], "weights2": [[1.5]], "bias1": [0.1], "bias2": [0.3]
        }"#;
        let net = Perceptron::from_serialized(serde_json::from_str(json).unwrap()).unwrap();
        let expected = f64::tanh(f64::tanh(0.5 * 1.0 + 0.1) * 1.5 + 0.3);
        assert!((net.forward(&[1.0])[0] - expected).abs() < 1e-12);

        let again = Perceptron::from_serialized(net.to_serialized()).unwrap();
        assert_eq!(again.forward(&[1.0]), net.forward(&[1.0]));
    }

    #[test]
    fn test_deserialize_rejects_bad_dimensions() {
        let mut data = Perceptron::random(Topology::new(2, 3, 1), &mut rng()).to_serialized();
        data.weights1[1].pop();
        assert!(matches!(
            Perceptron::from_serialized(data),
            Err(NetworkError::DimensionMismatch { what: "weights1 row", .. })
        ));

        let mut data = Perceptron::random(Topology::new(2, 3, 1), &mut rng()).to_serialized();
        data.bias2.push(0.0);
        assert!(matches!(
            Perceptron::from_serialized(data),
            Err(NetworkError::DimensionMismatch { what: "bias2", .. })
        ));
    }

    #[test]
    fn test_mutate_zero_rate_is_noop() {
        let mut rng = rng();
        let net = Perceptron::random(Topology::default(), &mut rng);
        let mut mutated = net.clone();
        mutated.mutate(0.0, &mut rng);
        assert_eq!(mutated, net);
    }

    #[test]
    fn test_mutate_full_rate_changes_every_parameter() {
        let mut rng = rng();
        for _ in 0..20 {
            let net = Perceptron::random(Topology::default(), &mut rng);
            let mut mutated = net.clone();
            mutated.mutate(1.0, &mut rng);
            let changed = net
                .parameters()
                .zip(mutated.parameters())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(changed, Topology::default().parameter_count());
            assert!(
                net.parameters()
                    .zip(mutated.parameters())
                    .all(|(a, b)| (a - b).abs() <= MUTATION_STEP)
            );
        }
    }

    #[test]
    fn test_crossover_with_self_is_identity() {
        let mut rng = rng();
        let net = Perceptron::random(Topology::default(), &mut rng);
        assert_eq!(net.crossover(&net, &mut rng), net);
    }

    #[test]
    fn test_crossover_picks_from_parents() {
        let mut rng = rng();
        let a = Perceptron::random(Topology::new(3, 5, 2), &mut rng);
        let b = Perceptron::random(Topology::new(3, 5, 2), &mut rng);
        let child = a.crossover(&b, &mut rng);
        assert_eq!(child.topology(), a.topology());
        for ((c, x), y) in child.parameters().zip(a.parameters()).zip(b.parameters()) {
            assert!(c == x || c == y);
        }
        // both parents contribute with overwhelming probability
        assert!(child.parameters().zip(a.parameters()).any(|(c, x)| c == x));
        assert!(child.parameters().zip(b.parameters()).any(|(c, y)| c == y));
    }

    #[test]
    #[should_panic(expected = "identical topology")]
    fn test_crossover_rejects_different_topologies() {
        let mut rng = rng();
        let a = Perceptron::random(Topology::new(3, 5, 2), &mut rng);
        let b = Perceptron::random(Topology::new(3, 4, 2), &mut rng);
        let _ = a.crossover(&b, &mut rng);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut rng = rng();
        let net = Perceptron::random(Topology::default(), &mut rng);
        let mut copy = net.clone();
        copy.mutate(1.0, &mut rng);
        assert_ne!(copy, net);
        assert_eq!(net.topology(), copy.topology());
    }

    #[test]
    fn test_zeroed_outputs_zero() {
        let net = Perceptron::zeroed(Topology::default());
        assert!(net.forward(&[0.7; 10]).iter().all(|o| *o == 0.0));
    }
}
