use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, sigmoid, softmax},
};

use crate::data::batcher::EmotionBatch;
use crate::data::encoding::ENCODING_WINDOW;

/// Dropout applied to the shared embedding in front of each head.
pub const HEAD_DROPOUT: f64 = 0.3;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DualHeadClassifierConfig {
    pub vocab_size: usize,
    pub num_labels: usize,
    #[config(default = 128)]
    pub max_seq_len: usize,
    #[config(default = 128)]
    pub d_model: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 512)]
    pub d_ff: usize,
    /// Dropout inside the encoder blocks
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 0.3)]
    pub head_dropout: f64,
}

impl DualHeadClassifierConfig {
    /// Encoder sized for the default 128-token window.
    pub fn for_vocab(vocab_size: usize, num_labels: usize) -> Self {
        Self::new(vocab_size, num_labels)
            .with_max_seq_len(ENCODING_WINDOW)
            .with_head_dropout(HEAD_DROPOUT)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DualHeadClassifier<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        DualHeadClassifier {
            token_embedding,
            position_embedding,
            layers,
            final_norm:       LayerNormConfig::new(self.d_model).init(device),
            label_head:       LinearConfig::new(self.d_model, self.num_labels).init(device),
            anomaly_head:     LinearConfig::new(self.d_model, 1).init(device),
            encoder_dropout:  DropoutConfig::new(self.dropout).init(),
            head_dropout:     DropoutConfig::new(self.head_dropout).init(),
            head_dropout_p:   self.head_dropout,
            encoder_dropout_p: self.dropout,
            eval_mode:        false,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        // Attention weights are never dropped; mode toggling covers the rest.
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(0.0)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Encoder block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions, which attention ignores.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input       = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Mode ─────────────────────────────────────────────────────────────────────
/// Train keeps dropout active, Eval switches it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Train,
    Eval,
}

// ─── Dual-head classifier ─────────────────────────────────────────────────────
//
//   input_ids ─► encoder ─► h[:, 0] ─┬─► dropout ─► label_head   ─► softmax
//                                    └─► dropout ─► anomaly_head ─► sigmoid
//
#[derive(Module, Debug)]
pub struct DualHeadClassifier<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub label_head:         Linear<B>,
    pub anomaly_head:       Linear<B>,
    pub encoder_dropout:    Dropout,
    pub head_dropout:       Dropout,
    head_dropout_p:         f64,
    encoder_dropout_p:      f64,
    eval_mode:              bool,
}

/// Both heads computed from one encoder pass.
pub struct DualHeadOutput<B: Backend> {
    /// [batch, num_labels], rows sum to 1
    pub label_probs: Tensor<B, 2>,
    /// [batch], each in [0, 1]
    pub anomaly:     Tensor<B, 1>,
}

pub struct ClassificationOutput<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub logits:  Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> DualHeadClassifier<B> {
    /// Switch every dropout layer on (Train) or off (Eval).
    pub fn with_mode(mut self, mode: ClassifierMode) -> Self {
        let (head_p, encoder_p) = match mode {
            ClassifierMode::Train => (self.head_dropout_p, self.encoder_dropout_p),
            ClassifierMode::Eval  => (0.0, 0.0),
        };
        self.head_dropout.prob    = head_p;
        self.encoder_dropout.prob = encoder_p;
        for layer in self.layers.iter_mut() {
            layer.dropout.prob = encoder_p;
        }
        self.eval_mode = mode == ClassifierMode::Eval;
        self
    }

    pub fn mode(&self) -> ClassifierMode {
        if self.eval_mode {
            ClassifierMode::Eval
        } else {
            ClassifierMode::Train
        }
    }

    pub fn num_labels(&self) -> usize {
        self.label_head.weight.dims()[1]
    }

    /// Summary embedding: encoder output at position 0, shape [batch, d_model].
    pub fn embed(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .reshape([1, seq_len])
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.encoder_dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        let [_, _, d_model] = x.dims();
        x.slice([0..batch_size, 0..1, 0..d_model])
            .reshape([batch_size, d_model])
    }

    /// Raw label scores before softmax.
    pub fn label_logits(&self, embedding: Tensor<B, 2>) -> Tensor<B, 2> {
        self.label_head.forward(self.head_dropout.forward(embedding))
    }

    /// Label distribution, shape [batch, num_labels].
    pub fn classify(&self, embedding: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.label_logits(embedding), 1)
    }

    /// Anomaly score in [0, 1], shape [batch].
    pub fn score_anomaly(&self, embedding: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch_size, _] = embedding.dims();
        sigmoid(self.anomaly_head.forward(self.head_dropout.forward(embedding)))
            .reshape([batch_size])
    }

    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> DualHeadOutput<B> {
        let embedding = self.embed(input_ids, attention_mask);
        DualHeadOutput {
            label_probs: self.classify(embedding.clone()),
            anomaly:     self.score_anomaly(embedding),
        }
    }

    /// Cross-entropy between the label head and the ground truth.
    pub fn forward_classification(&self, batch: EmotionBatch<B>) -> ClassificationOutput<B> {
        let embedding = self.embed(batch.input_ids, batch.attention_mask);
        let logits    = self.label_logits(embedding);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.labels.clone());
        ClassificationOutput { loss, logits, targets: batch.labels }
    }
}
