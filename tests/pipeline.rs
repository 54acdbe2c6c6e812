//! End-to-end: sample, persist, score and export

use sbl::{
    ExperimentConfig, GeneratorConfig, ModelVariant, OutputConfig, SequenceSample,
    adapters::{InMemoryRepository, MsgPackRepository},
    learners::{CategoricalDirichletLearner, GridFilterLearner},
    pipeline::{JsonlObserver, ObserverSet, SummaryObserver},
    ports::{SampleRepository, SequentialLearner},
};
use tempfile::TempDir;

#[test]
fn generated_sample_survives_storage_and_scores_end_to_end() {
    let dir = TempDir::new().unwrap();
    let mut config = ExperimentConfig::default().with_seed(12).with_seq_length(80);
    config.dirichlet.variant = ModelVariant::TransitionProbability;
    config.grid.s_res = 25;
    config.output = OutputConfig::new(dir.path().join("results")).with_delimiter(',');
    config.validate().unwrap();

    let sample = SequenceSample::generate(config.generator.clone(), config.seq_length, 12).unwrap();
    let sample_path = dir.path().join("sample.msgpack");
    MsgPackRepository::new().save(&sample, &sample_path).unwrap();
    let loaded = MsgPackRepository::new().load(&sample_path).unwrap();
    assert_eq!(loaded, sample);

    let writer = config.output.writer().unwrap();

    let mut dirichlet = CategoricalDirichletLearner::new(&loaded.sequence, config.dirichlet).unwrap();
    let mut summary = SummaryObserver::new();
    let mut jsonl = JsonlObserver::new(dir.path().join("dirichlet.jsonl")).unwrap();
    let table = {
        let mut observers = ObserverSet::new().with(&mut summary).with(&mut jsonl);
        dirichlet.run(&mut observers).unwrap()
    };
    assert_eq!(summary.summary().warnings, 1);
    let path = config.output.results_path(table.label(), config.seq_length);
    writer.write(&table, &path).unwrap();
    let (header, rows) = writer.read(&path).unwrap();
    assert_eq!(header.len(), 6 + table.parameter_names().len());
    assert_eq!(rows.len(), 80);
    assert!(path.ends_with("sbl_surprise_CD_TP_80.txt"));

    let jsonl_lines = std::fs::read_to_string(dir.path().join("dirichlet.jsonl")).unwrap();
    assert_eq!(jsonl_lines.lines().count(), 81);

    let binary = loaded.sequence.without_catch_trials();
    let mut grid = GridFilterLearner::new(&binary, config.grid).unwrap();
    let table = grid.run(&mut SummaryObserver::new()).unwrap();
    let path = config.output.results_path(table.label(), binary.len());
    writer.write(&table, &path).unwrap();
    let (_, rows) = writer.read(&path).unwrap();
    assert_eq!(rows.len(), binary.len() - 2);
}

#[test]
fn config_file_drives_the_generator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("experiment.json");
    let mut config = ExperimentConfig::default().with_seq_length(30).with_seed(5);
    config.generator = GeneratorConfig::new(1, vec![0.0, 1.0])
        .with_regime_change(0.0)
        .with_catch_probability(0.0);
    config.to_json_file(&path).unwrap();

    let loaded = ExperimentConfig::from_json_file(&path).unwrap();
    let sample = SequenceSample::generate(loaded.generator, loaded.seq_length, 5).unwrap();
    let observations = sample.sequence.observations();
    assert!(observations.windows(2).all(|w| w[0] != w[1]));

    let repo = InMemoryRepository::new();
    repo.save(&sample, &path).unwrap();
    assert_eq!(repo.load(&path).unwrap().seed, Some(5));
}
