use std::io::Write;

use super::*;
use crate::contrast::ContrastType;
use crate::linkage::Linkage;
use crate::matrix::ReduceMethod;
use crate::merge::MergeMethod;
use crate::metrics::DistanceMetric;

#[test]
fn test_default_config_is_valid() {
    let config = PipelineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.consensus.combine_proportion, 0.7);
    assert_eq!(config.consensus.combine_min_size, 5);
    assert_eq!(config.consensus.linkage, Linkage::Complete);
    assert_eq!(config.hierarchy.reduce, ReduceMethod::Mad);
    assert_eq!(config.hierarchy.n_dims, Some(500));
    assert_eq!(config.hierarchy.linkage, Linkage::Average);
    assert_eq!(config.merge.merge_cutoff, 0.05);
    assert_eq!(config.merge.merge_method, MergeMethod::PerNode);
    assert_eq!(config.contrast.contrast_type, ContrastType::F);
    assert_eq!(config.contrast.number, 20);
    println!("[VERIFIED] default PipelineConfig passes validation");
}

#[test]
fn test_validate_rejects_out_of_range_values() {
    let cases: Vec<(&str, Box<dyn Fn(&mut PipelineConfig)>)> = vec![
        ("proportion 0", Box::new(|c| c.consensus.combine_proportion = 0.0)),
        ("proportion > 1", Box::new(|c| c.consensus.combine_proportion = 1.5)),
        ("proportion NaN", Box::new(|c| c.consensus.combine_proportion = f64::NAN)),
        ("min size 0", Box::new(|c| c.consensus.combine_min_size = 0)),
        ("target 0", Box::new(|c| c.consensus.target_clusters = Some(0))),
        ("n_dims 0", Box::new(|c| c.hierarchy.n_dims = Some(0))),
        ("cutoff < 0", Box::new(|c| c.merge.merge_cutoff = -0.1)),
        ("cutoff > 1", Box::new(|c| c.merge.merge_cutoff = 1.01)),
        ("number 0", Box::new(|c| c.contrast.number = 0)),
    ];

    for (name, mutate) in cases {
        let mut config = PipelineConfig::default();
        mutate(&mut config);
        let err = config.validate().expect_err(name);
        assert!(err.is_configuration_error(), "{}: {:?}", name, err);
        println!("[VERIFIED] FAIL FAST ({}): {}", name, err);
    }
}

#[test]
fn test_n_dims_zero_allowed_without_reduction() {
    let mut config = PipelineConfig::default();
    config.hierarchy.reduce = ReduceMethod::None;
    config.hierarchy.n_dims = Some(0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_cutoff_bounds_inclusive() {
    let mut config = PipelineConfig::default();
    config.merge.merge_cutoff = 0.0;
    assert!(config.validate().is_ok());
    config.merge.merge_cutoff = 1.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_for_sample_count() {
    let config = PipelineConfig::default();
    assert!(config.validate_for(5).is_ok());
    let err = config.validate_for(4).unwrap_err();
    assert!(err.to_string().contains("combine_min_size"));

    let mut config = PipelineConfig::default();
    config.consensus.combine_min_size = 1;
    config.consensus.target_clusters = Some(10);
    assert!(config.validate_for(10).is_ok());
    assert!(config.validate_for(9).is_err());
    println!("[VERIFIED] validate_for checks sizes against sample count");
}

#[test]
fn test_from_toml_accepts_camel_case_aliases() {
    let toml = r#"
        [input]
        isCount = true

        [consensus]
        combineProportion = 0.8
        combineMinSize = 3

        [hierarchy]
        reduce = "var"
        nDims = 50
        metric = "correlation"
        linkage = "ward"

        [merge]
        mergeCutoff = 0.01
        mergeMethod = "across_all"

        [contrast]
        contrastType = "dendro"
        number = 5
    "#;

    let config = PipelineConfig::from_toml_str(toml).unwrap();
    assert!(config.input.is_count);
    assert_eq!(config.consensus.combine_proportion, 0.8);
    assert_eq!(config.consensus.combine_min_size, 3);
    assert_eq!(config.hierarchy.reduce, ReduceMethod::Var);
    assert_eq!(config.hierarchy.n_dims, Some(50));
    assert_eq!(config.hierarchy.metric, DistanceMetric::Correlation);
    assert_eq!(config.hierarchy.linkage, Linkage::Ward);
    assert_eq!(config.merge.merge_cutoff, 0.01);
    assert_eq!(config.merge.merge_method, MergeMethod::AcrossAll);
    assert_eq!(config.contrast.contrast_type, ContrastType::Dendro);
    assert_eq!(config.contrast.number, 5);
    // Unspecified sections keep their defaults.
    assert_eq!(config.consensus.linkage, Linkage::Complete);
    println!("[VERIFIED] camelCase aliases parsed: {:?}", config);
}

#[test]
fn test_from_toml_rejects_invalid_values() {
    let err = PipelineConfig::from_toml_str("[merge]\nmerge_cutoff = 2.0\n").unwrap_err();
    assert!(matches!(err, EnsembleError::Configuration { .. }));

    let err = PipelineConfig::from_toml_str("[merge]\nmerge_cutoff = \"high\"\n").unwrap_err();
    assert!(matches!(err, EnsembleError::ConfigLoad(_)));
}

#[test]
fn test_from_file_roundtrip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[consensus]\ncombine_proportion = 0.9\ntarget_clusters = 4").unwrap();

    let config = PipelineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.consensus.combine_proportion, 0.9);
    assert_eq!(config.consensus.target_clusters, Some(4));

    let missing = PipelineConfig::from_file(std::path::Path::new("/nonexistent/ensemble.toml"));
    assert!(matches!(missing, Err(EnsembleError::ConfigLoad(_))));
    println!("[VERIFIED] config loaded from {}", file.path().display());
}
