//! Weight loading tests

use super::*;
use crate::transformer::Architecture;
use tempfile::TempDir;

#[test]
fn test_canonical_name_strips_prefix() {
    assert_eq!(
        canonical_name("distilbert.transformer.layer.0.attention.q_lin.weight"),
        "transformer.layer.0.attention.q_lin.weight"
    );
    assert_eq!(canonical_name("bert.pooler.dense.bias"), "pooler.dense.bias");
    assert_eq!(canonical_name("classifier.weight"), "classifier.weight");
}

#[test]
fn test_canonical_name_legacy_layer_norm() {
    assert_eq!(canonical_name("bert.embeddings.LayerNorm.gamma"), "embeddings.LayerNorm.weight");
    assert_eq!(
        canonical_name("encoder.layer.3.output.LayerNorm.beta"),
        "encoder.layer.3.output.LayerNorm.bias"
    );
}

#[test]
fn test_checkpoint_name_keeps_heads_unprefixed() {
    assert_eq!(checkpoint_name(Architecture::DistilBert, "classifier.bias"), "classifier.bias");
    assert_eq!(
        checkpoint_name(Architecture::DistilBert, "pre_classifier.weight"),
        "pre_classifier.weight"
    );
    assert_eq!(checkpoint_name(Architecture::Bert, "pooler.dense.weight"), "bert.pooler.dense.weight");
    assert_eq!(
        canonical_name(&checkpoint_name(Architecture::Bert, "embeddings.LayerNorm.weight")),
        "embeddings.LayerNorm.weight"
    );
}

#[test]
fn test_layer_names_per_architecture() {
    let d = layer_names(Architecture::DistilBert, 2);
    assert_eq!(d.query, "transformer.layer.2.attention.q_lin");
    assert_eq!(d.output_norm, "transformer.layer.2.output_layer_norm");
    let b = layer_names(Architecture::Bert, 0);
    assert_eq!(b.attention_norm, "encoder.layer.0.attention.output.LayerNorm");
    assert!(embedding_names(Architecture::DistilBert).token_type.is_none());
    assert!(embedding_names(Architecture::Bert).token_type.is_some());
}

#[test]
fn test_detect_architecture_from_names() {
    let names = ["embeddings.word_embeddings.weight", "transformer.layer.0.ffn.lin1.weight"];
    assert_eq!(detect_architecture(names), Some(Architecture::DistilBert));
    assert_eq!(detect_architecture(["encoder.layer.1.output.dense.bias"]), Some(Architecture::Bert));
    assert_eq!(detect_architecture(["classifier.weight"]), None);
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    let entries = vec![
        StateEntry {
            name: "embeddings.LayerNorm.weight".into(),
            shape: vec![3],
            data: vec![1.0, 2.0, 3.0],
        },
        StateEntry { name: "classifier.weight".into(), shape: vec![2, 3], data: vec![0.5; 6] },
    ];
    save_safetensors(&path, &entries, Architecture::Bert, BTreeMap::new()).unwrap();

    let stored = read_safetensors(&path).unwrap();
    assert!(stored.contains_key("bert.embeddings.LayerNorm.weight"));
    assert!(stored.contains_key("classifier.weight"));

    let mut weights = WeightMap::load(dir.path()).unwrap();
    assert_eq!(weights.len(), 2);
    let norm = weights.require("embeddings.LayerNorm.weight", &[3]).unwrap();
    assert_eq!(norm, vec![1.0, 2.0, 3.0]);
    assert_eq!(weights.remaining(), vec!["classifier.weight".to_string()]);
}

#[test]
fn test_take_checks_shape() {
    let mut weights = WeightMap::new();
    weights.insert("classifier.weight", vec![3, 4], vec![0.0; 12]);
    let err = weights.take("classifier.weight", &[2, 4]).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
    assert!(weights.take("missing", &[1]).unwrap().is_none());
}

#[test]
fn test_half_precision_tensors_load_as_f32() {
    let dir = TempDir::new().unwrap();
    let values = [half::f16::from_f32(1.5), half::f16::from_f32(-2.0)];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let view = safetensors::tensor::TensorView::new(safetensors::Dtype::F16, vec![2], &bytes)
        .unwrap();
    let serialized = safetensors::serialize(vec![("bert.pooler.dense.bias", view)], &None).unwrap();
    std::fs::write(dir.path().join("model.safetensors"), serialized).unwrap();

    let mut weights = WeightMap::load(dir.path()).unwrap();
    assert_eq!(weights.require("pooler.dense.bias", &[2]).unwrap(), vec![1.5, -2.0]);
}

#[test]
fn test_pickle_only_directory_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pytorch_model.bin"), b"not loaded").unwrap();
    let err = WeightMap::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("pytorch_model.bin"));
}

#[test]
fn test_empty_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(WeightMap::load(dir.path()).is_err());
}
