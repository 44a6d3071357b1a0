// ============================================================
// Layer 5 — Causal Language Model (Burn)
// ============================================================
// A decoder-only transformer with LoRA adapters on the
// attention projections named in target_modules (query and
// value by default). Every non-adapter
// parameter is created frozen (require_grad = false), so the
// optimizer only ever updates the adapter matrices — the whole
// point of parameter-efficient fine-tuning.
//
// Architecture per block (pre-norm):
//   x = x + CausalSelfAttention(norm1(x))
//   x = x + FFN(norm2(x))            (GELU activation)
//
// Causality is enforced with burn's autoregressive mask:
// position t may only attend to positions ≤ t, which is what
// makes next-token prediction a valid training objective.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Radford et al. (2019) GPT-2
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::generate_autoregressive_mask,
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, softmax},
    tensor::backend::AutodiffBackend,
};

use crate::ml::lora::{LoraConfig, LoraLinear, LoraLinearConfig};
use crate::ml::model_config::PretrainedConfig;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CausalLmConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub dropout:     f64,
}

impl CausalLmConfig {
    /// Read the architecture from an HF-style config mapping,
    /// with conservative defaults for absent fields.
    pub fn from_pretrained(cfg: &PretrainedConfig) -> Self {
        let d_model = cfg.usize_or("hidden_size", 512);
        Self {
            vocab_size:  cfg.usize_or("vocab_size", 32_000),
            max_seq_len: cfg.context_window(),
            d_model,
            num_heads:   cfg.usize_or("num_attention_heads", 8),
            num_layers:  cfg.usize_or("num_hidden_layers", 6),
            d_ff:        cfg.usize_or("intermediate_size", 4 * d_model),
            dropout:     cfg.f64_or("dropout", 0.1),
        }
    }

    /// Build the model with adapters configured by `lora`.
    pub fn init<B: Backend>(&self, lora: &LoraConfig, device: &B::Device) -> CausalLmModel<B> {
        let token_embedding = EmbeddingConfig::new(self.vocab_size, self.d_model)
            .init(device)
            .no_grad();
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model)
            .init(device)
            .no_grad();
        let layers: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(lora, device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device).no_grad();
        let lm_head = LinearConfig::new(self.d_model, self.vocab_size)
            .with_bias(false)
            .init(device)
            .no_grad();
        let dropout = DropoutConfig::new(self.dropout).init();

        CausalLmModel {
            token_embedding, position_embedding, layers,
            final_norm, lm_head, dropout,
            max_seq_len: self.max_seq_len,
            vocab_size:  self.vocab_size,
        }
    }

    fn build_decoder_block<B: Backend>(
        &self,
        lora:   &LoraConfig,
        device: &B::Device,
    ) -> DecoderBlock<B> {
        let frozen = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_bias(false)
                .init(device)
                .no_grad()
        };
        // target_modules decides which projections carry an
        // adapter; everything else stays frozen.
        let projection = |name: &str| {
            if lora.is_target(name) {
                Projection::Adapted(
                    LoraLinearConfig::new(
                        self.d_model, self.d_model, lora.r, lora.alpha, lora.dropout,
                    )
                    .init(device),
                )
            } else {
                Projection::Frozen(frozen(self.d_model, self.d_model))
            }
        };

        let attention = CausalSelfAttention {
            q_proj:    projection("q_proj"),
            k_proj:    projection("k_proj"),
            v_proj:    projection("v_proj"),
            o_proj:    projection("o_proj"),
            dropout:   DropoutConfig::new(self.dropout).init(),
            num_heads: self.num_heads,
            head_dim:  self.d_model / self.num_heads,
        };

        DecoderBlock {
            attention,
            ffn_linear1: frozen(self.d_model, self.d_ff),
            ffn_linear2: frozen(self.d_ff, self.d_model),
            norm1:       LayerNormConfig::new(self.d_model).init(device).no_grad(),
            norm2:       LayerNormConfig::new(self.d_model).init(device).no_grad(),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Projection ───────────────────────────────────────────────────────────────
/// One attention projection, either carrying a trainable
/// low-rank adapter or fully frozen.
#[derive(Module, Debug)]
pub enum Projection<B: Backend> {
    Adapted(LoraLinear<B>),
    Frozen(Linear<B>),
}

impl<B: Backend> Projection<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Projection::Adapted(inner) => inner.forward(x),
            Projection::Frozen(inner)  => inner.forward(x),
        }
    }

    pub fn num_trainable_params(&self) -> usize {
        match self {
            Projection::Adapted(inner) => inner.num_trainable_params(),
            Projection::Frozen(_)      => 0,
        }
    }
}

// ─── CausalSelfAttention ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalSelfAttention<B: Backend> {
    pub q_proj:    Projection<B>,
    pub k_proj:    Projection<B>,
    pub v_proj:    Projection<B>,
    pub o_proj:    Projection<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
    pub head_dim:  usize,
}

impl<B: Backend> CausalSelfAttention<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_len, d_model] = x.dims();

        let q = self.split_heads(self.q_proj.forward(x.clone()));
        let k = self.split_heads(self.k_proj.forward(x.clone()));
        let v = self.split_heads(self.v_proj.forward(x));

        // Scaled dot-product scores: [batch*heads, seq, seq]
        let scores = q
            .matmul(k.swap_dims(1, 2))
            .div_scalar((self.head_dim as f64).sqrt());

        // Future positions are masked out per head.
        let mask = generate_autoregressive_mask::<B>(
            batch_size * self.num_heads,
            seq_len,
            &scores.device(),
        );
        let scores = scores.mask_fill(mask, f32::NEG_INFINITY);

        let attn = self.dropout.forward(softmax(scores, 2));
        let context = attn.matmul(v); // [batch*heads, seq, head_dim]

        let merged = context
            .reshape([batch_size, self.num_heads, seq_len, self.head_dim])
            .swap_dims(1, 2)
            .reshape([batch_size, seq_len, d_model]);

        self.o_proj.forward(merged)
    }

    /// [batch, seq, d_model] → [batch*heads, seq, head_dim]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_len, _] = x.dims();
        x.reshape([batch_size, seq_len, self.num_heads, self.head_dim])
            .swap_dims(1, 2)
            .reshape([batch_size * self.num_heads, seq_len, self.head_dim])
    }
}

// ─── DecoderBlock ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub attention:   CausalSelfAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_out = self.attention.forward(self.norm1.forward(x.clone()));
        let x = x + self.dropout.forward(attn_out);

        let ffn_out = self
            .ffn_linear2
            .forward(gelu(self.ffn_linear1.forward(self.norm2.forward(x.clone()))));
        x + self.dropout.forward(ffn_out)
    }
}

// ─── CausalLmModel ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalLmModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub max_seq_len:        usize,
    pub vocab_size:         usize,
}

impl<B: Backend> CausalLmModel<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, vocab]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb = self.token_embedding.forward(input_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        self.lm_head.forward(x)
    }

    /// Shifted next-token cross-entropy. Positions whose
    /// target is the pad token are excluded from the loss —
    /// the collator pads with `pad_id` and masks those
    /// positions out of the attention mask.
    pub fn forward_loss(
        &self,
        input_ids: Tensor<B, 2, Int>,
        pad_id:    usize,
    ) -> Tensor<B, 1>
    where
        B: AutodiffBackend,
    {
        let [batch_size, seq_len] = input_ids.dims();
        debug_assert!(seq_len >= 2, "need at least two tokens to shift");

        let logits = self.forward(input_ids.clone());

        // Predict token t+1 from the prefix ending at t:
        // logits lose the last position, targets lose the first.
        let logits = logits
            .slice([0..batch_size, 0..seq_len - 1, 0..self.vocab_size])
            .reshape([batch_size * (seq_len - 1), self.vocab_size]);
        let targets = input_ids
            .slice([0..batch_size, 1..seq_len])
            .reshape([batch_size * (seq_len - 1)]);

        let ce = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![pad_id]))
            .init(&logits.device());
        ce.forward(logits, targets)
    }

    /// (trainable, total) parameter counts — the adapters are
    /// the only trainable parameters in the model.
    pub fn parameter_counts(&self) -> (usize, usize) {
        let trainable = self
            .layers
            .iter()
            .map(|layer| {
                let attn = &layer.attention;
                attn.q_proj.num_trainable_params()
                    + attn.k_proj.num_trainable_params()
                    + attn.v_proj.num_trainable_params()
                    + attn.o_proj.num_trainable_params()
            })
            .sum();
        (trainable, self.num_params())
    }
}
