//! Deterministic sentence embeddings.
//!
//! The default model hashes word tokens and character trigrams into a
//! fixed-width L2-normalized vector. It is not a learned model, but it is
//! deterministic, dimension-stable, and cheap, which is what the index and
//! the self-retrieval property depend on. A learned model can be swapped in
//! behind [`Embedder`] as long as chunks and queries go through the same
//! instance.

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HashedNgramEmbedder {
    pub dimensions: usize,
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashedNgramEmbedder {
    fn bucket(&self, token: &str) -> usize {
        // FNV-1a over the token bytes
        let mut hash = 0xcbf29ce484222325u64;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dimensions.max(1) as u64) as usize
    }
}

impl Embedder for HashedNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();

        for word in lowered.split(|character: char| !character.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }

            vector[self.bucket(word)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for trigram in chars.windows(3) {
                let token: String = trigram.iter().collect();
                vector[self.bucket(&token)] += 0.5;
            }
        }

        let magnitude = vector
            .iter()
            .map(|component| component * component)
            .sum::<f32>()
            .sqrt();
        if magnitude > 0.0 {
            for component in &mut vector {
                *component /= magnitude;
            }
        }

        vector
    }
}
