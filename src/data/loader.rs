//! Tokenized datasets and padded mini-batches

use super::dataset::LoanSample;
use crate::error::Result;
use crate::tokenizer::{Encoding, WordPieceTokenizer};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Samples tokenized once, with their original texts kept for reports
#[derive(Debug, Clone, Default)]
pub struct TextDataset {
    pub encodings: Vec<Encoding>,
    pub labels: Vec<usize>,
    pub texts: Vec<String>,
}

impl TextDataset {
    /// Tokenize every sample to at most `max_length` IDs
    pub fn new(
        samples: &[LoanSample],
        tokenizer: &WordPieceTokenizer,
        max_length: usize,
    ) -> Result<Self> {
        let mut dataset = Self::default();
        for sample in samples {
            dataset.encodings.push(tokenizer.encode_for_model(&sample.text, max_length)?);
            dataset.labels.push(sample.label);
            dataset.texts.push(sample.text.clone());
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A padded mini-batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Rows padded to the longest row of the batch
    pub input_ids: Vec<Vec<u32>>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<Vec<u32>>,
    pub labels: Vec<usize>,
    /// Positions of the rows in the dataset
    pub indices: Vec<usize>,
}

impl Batch {
    /// Pad the given dataset rows into one batch
    pub fn collate(dataset: &TextDataset, indices: &[usize], pad_id: u32) -> Self {
        let seq = indices.iter().map(|&i| dataset.encodings[i].len()).max().unwrap_or(0);
        let mut batch = Self {
            input_ids: Vec::with_capacity(indices.len()),
            attention_mask: Vec::with_capacity(indices.len()),
            labels: Vec::with_capacity(indices.len()),
            indices: indices.to_vec(),
        };
        for &i in indices {
            let enc = &dataset.encodings[i];
            let mut ids = enc.input_ids.clone();
            let mut mask = enc.attention_mask.clone();
            ids.resize(seq, pad_id);
            mask.resize(seq, 0);
            batch.input_ids.push(ids);
            batch.attention_mask.push(mask);
            batch.labels.push(dataset.labels[i]);
        }
        batch
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Padded sequence length
    pub fn seq_len(&self) -> usize {
        self.input_ids.first().map_or(0, Vec::len)
    }

    /// Row-major `len() x seq_len()` token IDs
    pub fn flat_input_ids(&self) -> Vec<u32> {
        self.input_ids.concat()
    }

    /// Row-major `len() x seq_len()` attention mask
    pub fn flat_attention_mask(&self) -> Vec<u32> {
        self.attention_mask.concat()
    }
}

/// Iterates a dataset in fixed-size batches
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: TextDataset,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    pad_id: u32,
}

impl DataLoader {
    pub fn new(
        dataset: TextDataset,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
        pad_id: u32,
    ) -> Self {
        Self { dataset, batch_size: batch_size.max(1), shuffle, seed, pad_id }
    }

    pub fn dataset(&self) -> &TextDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of batches, `ceil(n / batch_size)`
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Row order for `epoch`: reshuffled from `seed + epoch` when shuffling
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Batches of one epoch
    pub fn batches(&self, epoch: usize) -> impl Iterator<Item = Batch> + '_ {
        let order = self.order(epoch);
        let chunks: Vec<Vec<usize>> =
            order.chunks(self.batch_size).map(<[usize]>::to_vec).collect();
        chunks.into_iter().map(move |idx| Batch::collate(&self.dataset, &idx, self.pad_id))
    }
}

/// Tokenize both splits and build (shuffled train, ordered test) loaders
pub fn create_dataloaders(
    train: &[LoanSample],
    test: &[LoanSample],
    tokenizer: &WordPieceTokenizer,
    batch_size: usize,
    max_length: usize,
    seed: u64,
) -> Result<(DataLoader, DataLoader)> {
    let pad = tokenizer.pad_id();
    let train_data = TextDataset::new(train, tokenizer, max_length)?;
    let test_data = TextDataset::new(test, tokenizer, max_length)?;
    Ok((
        DataLoader::new(train_data, batch_size, true, seed, pad),
        DataLoader::new(test_data, batch_size, false, seed, pad),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerConfig;

    fn tokenizer() -> WordPieceTokenizer {
        let vocab = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "late", "payment", "paid", "on", "time"];
        WordPieceTokenizer::from_tokens(
            vocab.iter().map(|s| s.to_string()).collect(),
            TokenizerConfig::default(),
        )
        .unwrap()
    }

    fn samples(n: usize) -> Vec<LoanSample> {
        (0..n)
            .map(|i| LoanSample {
                text: if i % 2 == 0 { "paid on time".into() } else { "late".into() },
                label: i % 2,
            })
            .collect()
    }

    #[test]
    fn test_collate_pads_to_longest_row() {
        let dataset = TextDataset::new(&samples(2), &tokenizer(), 16).unwrap();
        let batch = Batch::collate(&dataset, &[0, 1], 0);
        assert_eq!(batch.seq_len(), 5);
        assert_eq!(batch.input_ids[1], vec![2, 4, 3, 0, 0]);
        assert_eq!(batch.attention_mask[1], vec![1, 1, 1, 0, 0]);
        assert_eq!(batch.labels, vec![0, 1]);
        assert_eq!(batch.flat_input_ids().len(), 10);
    }

    #[test]
    fn test_len_is_ceiling_of_batches() {
        let dataset = TextDataset::new(&samples(10), &tokenizer(), 16).unwrap();
        let loader = DataLoader::new(dataset, 4, false, 0, 0);
        assert_eq!(loader.len(), 3);
        let sizes: Vec<usize> = loader.batches(0).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_unshuffled_order_is_stable() {
        let dataset = TextDataset::new(&samples(5), &tokenizer(), 16).unwrap();
        let loader = DataLoader::new(dataset, 2, false, 9, 0);
        assert_eq!(loader.order(0), vec![0, 1, 2, 3, 4]);
        assert_eq!(loader.order(3), loader.order(0));
    }

    #[test]
    fn test_shuffle_is_per_epoch_and_deterministic() {
        let dataset = TextDataset::new(&samples(40), &tokenizer(), 16).unwrap();
        let loader = DataLoader::new(dataset, 8, true, 42, 0);
        assert_eq!(loader.order(1), loader.order(1));
        assert_ne!(loader.order(0), loader.order(1));
        let mut sorted = loader.order(2);
        sorted.sort_unstable();
        assert_eq!(sorted, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_create_dataloaders() {
        let (train, test) =
            create_dataloaders(&samples(6), &samples(3), &tokenizer(), 2, 4, 0).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 2);
        assert!(train.dataset().encodings.iter().all(|e| e.len() <= 4));
        assert_eq!(test.order(0), vec![0, 1, 2]);
    }
}
