// ============================================================
// Layer 5 — LoRA Adapter
// ============================================================
// Low-Rank Adaptation: instead of updating a frozen base
// weight W, train a low-rank update ΔW = A·B with
// A ∈ R^{d_in×r}, B ∈ R^{r×d_out}, r ≪ d:
//
//   y = x·W + (dropout(x)·A·B) · (alpha / r)
//
// A starts as small Gaussian noise and B as zeros, so the
// adapted layer is exactly the base layer at step 0. Only A
// and B receive gradients; the base weight is created with
// require_grad = false.
//
// Reference: Hu et al. (2021) LoRA: Low-Rank Adaptation of
//            Large Language Models

use anyhow::{bail, Result};
use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::Distribution,
};
use serde::{Deserialize, Serialize};

// ─── LoraConfig ───────────────────────────────────────────────────────────────
/// Adapter hyperparameters, saved alongside the trained
/// adapter so inference can rebuild the same shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoraConfig {
    /// Rank of the update matrices
    pub r: usize,

    /// Scaling numerator — effective scale is alpha / r
    pub alpha: usize,

    /// Dropout on the adapter input path
    pub dropout: f64,

    /// Names of the projections carrying an adapter
    pub target_modules: Vec<String>,
}

/// The projections an adapter can be placed on. The feed-
/// forward linears stay frozen; adapter placement is limited
/// to the attention block.
pub const ADAPTABLE_PROJECTIONS: [&str; 4] = ["q_proj", "k_proj", "v_proj", "o_proj"];

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            r: 16,
            alpha: 64,
            dropout: 0.1,
            target_modules: vec!["q_proj".into(), "v_proj".into()],
        }
    }
}

impl LoraConfig {
    pub fn scaling(&self) -> f64 {
        self.alpha as f64 / self.r as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.r == 0 {
            bail!("LoRA rank must be > 0");
        }
        if self.alpha == 0 {
            bail!("LoRA alpha must be > 0");
        }
        if !(0.0..=1.0).contains(&self.dropout) {
            bail!("LoRA dropout must be within [0, 1], got {}", self.dropout);
        }
        if self.target_modules.is_empty() {
            bail!("LoRA target_modules cannot be empty");
        }
        for name in &self.target_modules {
            if !ADAPTABLE_PROJECTIONS.contains(&name.as_str()) {
                bail!(
                    "unknown LoRA target module '{}' (supported: {:?})",
                    name,
                    ADAPTABLE_PROJECTIONS,
                );
            }
        }
        Ok(())
    }

    /// Whether the named projection gets an adapter.
    pub fn is_target(&self, name: &str) -> bool {
        self.target_modules.iter().any(|m| m == name)
    }
}

/// Trainable parameters a single adapted projection adds.
pub fn adapter_param_count(d_input: usize, d_output: usize, rank: usize) -> usize {
    rank * (d_input + d_output)
}

// ─── LoraLinear ───────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LoraLinearConfig {
    pub d_input:  usize,
    pub d_output: usize,
    pub rank:     usize,
    pub alpha:    usize,
    pub dropout:  f64,
}

impl LoraLinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LoraLinear<B> {
        // Frozen base weight — never receives gradients.
        let base = Param::from_tensor(Tensor::random(
            [self.d_input, self.d_output],
            Distribution::Normal(0.0, 0.02),
            device,
        ))
        .set_require_grad(false);

        // A ~ N(0, 0.02), B = 0 → zero update at initialization
        let lora_a = Param::from_tensor(Tensor::random(
            [self.d_input, self.rank],
            Distribution::Normal(0.0, 0.02),
            device,
        ));
        let lora_b = Param::from_tensor(Tensor::zeros([self.rank, self.d_output], device));

        LoraLinear {
            base,
            lora_a,
            lora_b,
            dropout: DropoutConfig::new(self.dropout).init(),
            scaling: self.alpha as f64 / self.rank as f64,
        }
    }
}

/// A linear projection with a frozen base weight and a
/// trainable low-rank update on top.
#[derive(Module, Debug)]
pub struct LoraLinear<B: Backend> {
    base:    Param<Tensor<B, 2>>,
    lora_a:  Param<Tensor<B, 2>>,
    lora_b:  Param<Tensor<B, 2>>,
    dropout: Dropout,
    scaling: f64,
}

impl<B: Backend> LoraLinear<B> {
    /// x: [batch, seq_len, d_input] → [batch, seq_len, d_output]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let base_out = x.clone().matmul(self.base.val().unsqueeze::<3>());

        let update = self
            .dropout
            .forward(x)
            .matmul(self.lora_a.val().unsqueeze::<3>())
            .matmul(self.lora_b.val().unsqueeze::<3>());

        base_out + update.mul_scalar(self.scaling)
    }

    /// Trainable (adapter) parameter count for this layer.
    pub fn num_trainable_params(&self) -> usize {
        let [d_input, rank] = self.lora_a.val().dims();
        let [_, d_output] = self.lora_b.val().dims();
        adapter_param_count(d_input, d_output, rank)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_run_settings() {
        let cfg = LoraConfig::default();
        assert_eq!(cfg.r, 16);
        assert_eq!(cfg.alpha, 64);
        assert!((cfg.scaling() - 4.0).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(LoraConfig { r: 0, ..Default::default() }.validate().is_err());
        assert!(LoraConfig { alpha: 0, ..Default::default() }.validate().is_err());
        assert!(LoraConfig { dropout: 1.5, ..Default::default() }.validate().is_err());
        assert!(
            LoraConfig { target_modules: vec![], ..Default::default() }
                .validate()
                .is_err()
        );
        // Targets must name an attention projection.
        assert!(
            LoraConfig { target_modules: vec!["gate_proj".into()], ..Default::default() }
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_default_targets_query_and_value() {
        let cfg = LoraConfig::default();
        assert!(cfg.is_target("q_proj"));
        assert!(cfg.is_target("v_proj"));
        assert!(!cfg.is_target("k_proj"));
        assert!(!cfg.is_target("o_proj"));
    }

    #[test]
    fn test_adapter_param_arithmetic() {
        // r=16 on a 512×512 projection: 16*(512+512)
        assert_eq!(adapter_param_count(512, 512, 16), 16_384);
        // rank-1 adapter on a rectangular projection
        assert_eq!(adapter_param_count(3, 7, 1), 10);
    }
}
