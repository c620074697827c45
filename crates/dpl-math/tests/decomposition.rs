//! End-to-end decomposition scenarios on small hand-checked datasets.

use dpl_common::{DatapointId, FeatureGrouping, FeatureTable, GroupId, Label, Predictions};
use dpl_math::{
    class_loss_curve, decompose, loss_curve, GroupingInput, StandardWeight, ThresholdGrid,
};

#[test]
fn two_negatives_peel_with_multipliers_two_then_one() {
    let preds = Predictions::from_slices(&[0.7, 0.3], &[0u8, 0]).unwrap();
    let grid = ThresholdGrid::linspace(11).unwrap();
    let d = decompose(&preds, &StandardWeight::Uniform, &grid, &[Label::Negative], None).unwrap();

    let multipliers: Vec<usize> = d.curves.iter().map(|c| c.remaining).collect();
    assert_eq!(multipliers, vec![2, 1]);
    assert_eq!(d.curves[0].probability, 0.3);
    assert_eq!(d.curves[1].probability, 0.7);

    let by_id = d.curves_by_id();
    // c = 0.2 is grid index 2: 0.3 > 0.2 -> 0.2 / 2 * 2
    assert!((by_id[&DatapointId(1)][2] - 0.2).abs() < 1e-15);
    assert!((by_id[&DatapointId(0)][2] - 0.1).abs() < 1e-15);
}

#[test]
fn two_point_scenario_on_coarse_grid() {
    let preds = Predictions::from_slices(&[0.2, 0.8], &[0u8, 1]).unwrap();
    let grid = ThresholdGrid::linspace(3).unwrap();
    let curve = loss_curve(&preds, &StandardWeight::Uniform, &grid).unwrap();
    assert_eq!(curve.values[1], 0.0);

    let d = decompose(&preds, &StandardWeight::Uniform, &grid, &Label::ALL, None).unwrap();
    assert!(d.curves.iter().all(|c| c.values[1] == 0.0));
}

#[test]
fn mixed_dataset_with_categorical_groups() {
    let probs = [0.1, 0.9, 0.4, 0.6, 0.3, 0.75];
    let labels = [0u8, 1, 0, 1, 1, 0];
    let preds = Predictions::from_slices(&probs, &labels).unwrap();
    let features = FeatureTable::new()
        .with_column("sex_f", vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0])
        .with_column("sex_m", vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
    let grouping = FeatureGrouping::categorical([("sex_f", "female"), ("sex_m", "male")]);
    let grid = ThresholdGrid::default();
    let w = StandardWeight::Quadratic;

    let d = decompose(
        &preds,
        &w,
        &grid,
        &Label::ALL,
        Some(GroupingInput::new(&grouping, &features)),
    )
    .unwrap();

    assert_eq!(
        d.group_labels.as_deref(),
        Some(&["female".to_string(), "male".to_string()][..])
    );
    let groups = d.groups_by_id();
    assert_eq!(groups.len(), 6);
    assert_eq!(groups[&DatapointId(0)], GroupId(0));
    assert_eq!(groups[&DatapointId(4)], GroupId(1));

    // here every negative is female and every positive male
    let neg = class_loss_curve(&preds, &w, &grid, Label::Negative).unwrap();
    let female = &d.group_curves(Label::Negative)[&GroupId(0)];
    for (a, b) in female.values.iter().zip(&neg.values) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn entropy_decomposition_needs_interior_grid() {
    let preds = Predictions::from_slices(&[0.3, 0.6], &[0u8, 1]).unwrap();
    let full = ThresholdGrid::default();
    assert!(decompose(&preds, &StandardWeight::Entropy, &full, &Label::ALL, None).is_err());

    let interior = full.without_endpoints().unwrap();
    let d = decompose(&preds, &StandardWeight::Entropy, &interior, &Label::ALL, None).unwrap();
    assert_eq!(d.thresholds.len(), 999);
    assert!(d
        .curves
        .iter()
        .flat_map(|c| c.values.iter())
        .all(|v| v.is_finite()));
}

#[test]
fn decomposition_serializes_without_empty_groups() {
    let preds = Predictions::from_slices(&[0.4], &[1u8]).unwrap();
    let grid = ThresholdGrid::linspace(3).unwrap();
    let d = decompose(&preds, &StandardWeight::Uniform, &grid, &[Label::Positive], None).unwrap();
    let json = serde_json::to_value(&d).unwrap();
    assert!(json.get("group_labels").is_none());
    assert!(json["curves"][0].get("group").is_none());
    assert_eq!(json["curves"][0]["target"], 1);
}
