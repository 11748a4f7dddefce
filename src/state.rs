use crate::algo::{AlgoChildConfig, AlgorithmGroup, AlgorithmGroupConfig, AttributeRetriever, AttributeRetrieverConfig, BagOfWordsAlgorithm, BagOfWordsConfig, KeyValueAlgorithm, RetrievalAlgorithm, StubAlgorithm};
use crate::config::Config;
use crate::dedup::{Dedup, DedupChain, DuplicateDedup};
use crate::error::{AppError, Result};
use crate::falcon::{Falcon, MapFalcon};
use crate::manager::{SuggestionManager, SuggestionManagerConfig};
use crate::merge::MergeOp;
use crate::registry::Registry;
use crate::rescore::{CombineOp, DomainBoostTwiddler, IdentityTwiddler, RescorerGroup, RescorerGroupConfig, Twiddler, TwiddlerChildConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
pub struct AppState {
    pub manager: Arc<SuggestionManager>,
    pub config: Arc<Config>,
    ready: AtomicBool,
}

impl AppState {
    /// Builds the per-family registries, binds the component set this
    /// release ships (empty in-memory falcons/indices — population from a
    /// persisted index remains out of scope, see `falcon` module docs),
    /// resolves the configured names into a `SuggestionManager`, and marks
    /// the service ready once construction succeeds.
    pub fn new(config: Config) -> Result<Self> {
        let algo_registry: Registry<dyn RetrievalAlgorithm> = Registry::new();
        let twiddler_registry: Registry<dyn Twiddler> = Registry::new();
        let dedup_registry: Registry<dyn Dedup> = Registry::new();

        bind_algorithms(&algo_registry)?;
        bind_twiddlers(&twiddler_registry)?;
        bind_dedupers(&dedup_registry)?;

        let primary_algo = algo_registry
            .make_shared(&config.primary_algo, None)
            .map_err(|e| AppError::RegistryInit(e.to_string()))?;
        let fallback_algo = algo_registry
            .make_shared(&config.fallback_algo, None)
            .map_err(|e| AppError::RegistryInit(e.to_string()))?;
        let secondary_algo = algo_registry
            .make_shared(&config.secondary_algo, None)
            .map_err(|e| AppError::RegistryInit(e.to_string()))?;

        let dedupers = DedupChain::new(
            config
                .dedupers
                .iter()
                .map(|name| {
                    dedup_registry
                        .make_shared(name, None)
                        .map(|arc| Box::new(ArcDedup(arc)) as Box<dyn Dedup>)
                        .map_err(|e| AppError::RegistryInit(e.to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
        );

        let primary_rescorer = single_child_rescorer(&twiddler_registry, &config.primary_twiddler)?;
        let secondary_rescorer = single_child_rescorer(&twiddler_registry, &config.secondary_twiddler)?;

        let manager = SuggestionManager::new(
            primary_algo,
            fallback_algo,
            secondary_algo,
            dedupers,
            primary_rescorer,
            secondary_rescorer,
            SuggestionManagerConfig {
                threadpool_size: config.threadpool_size,
                threadpool_capacity: config.threadpool_capacity,
                top_suggestion_min_freq_for_instant: config.top_suggestion_min_freq_for_instant,
                top_suggestion_min_selection_probability_for_instant: config
                    .top_suggestion_min_selection_probability_for_instant,
                max_suggestions_multiplier: config.max_suggestions_multiplier,
                min_secondary_suggestions: config.min_secondary_suggestions,
            },
        );

        let state = Self {
            manager,
            config: Arc::new(config),
            ready: AtomicBool::new(true),
        };

        Ok(state)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// `Registry<dyn Dedup>` yields `Arc<dyn Dedup>`, but `DedupChain` wants
/// owned `Box<dyn Dedup>` entries; this adapter bridges the two without
/// changing either's contract.
struct ArcDedup(Arc<dyn Dedup>);

impl Dedup for ArcDedup {
    fn dedup(&self, completions: &mut Vec<crate::model::Completion>) {
        self.0.dedup(completions)
    }
}

fn single_child_rescorer(registry: &Registry<dyn Twiddler>, name: &str) -> Result<RescorerGroup> {
    let twiddler = registry
        .make_shared(name, None)
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;
    Ok(RescorerGroup::new(RescorerGroupConfig {
        children: vec![TwiddlerChildConfig {
            twiddler,
            weight: 1.0,
            op: CombineOp::Add,
            required: true,
        }],
        ..Default::default()
    }))
}

fn bind_twiddlers(registry: &Registry<dyn Twiddler>) -> Result<()> {
    registry
        .bind("domain_boost", serde_json::Value::Null, |_cfg| {
            Ok(Arc::new(DomainBoostTwiddler) as Arc<dyn Twiddler>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;
    registry
        .bind("identity", serde_json::Value::Null, |_cfg| Ok(Arc::new(IdentityTwiddler) as Arc<dyn Twiddler>))
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;
    Ok(())
}

fn bind_dedupers(registry: &Registry<dyn Dedup>) -> Result<()> {
    registry
        .bind("duplicate", serde_json::Value::Null, |_cfg| Ok(Arc::new(DuplicateDedup) as Arc<dyn Dedup>))
        .map_err(|e| AppError::RegistryInit(e.to_string()))
}

/// Binds the retrieval-algorithm topology this release ships: an empty
/// prefix index wrapping an empty falcon (data population is out of scope,
/// see `falcon`), a bag-of-words retriever over that same prefix lookup, an
/// attribute retriever over an empty attribute index, a required/optional
/// `primary_group` combining prefix+bow, and explicit fallback/template
/// stubs.
fn bind_algorithms(registry: &Registry<dyn RetrievalAlgorithm>) -> Result<()> {
    let empty_falcon: Arc<dyn Falcon> = Arc::new(MapFalcon::new(HashMap::new()));

    registry
        .bind("prefix", serde_json::Value::Null, {
            let falcon = Arc::clone(&empty_falcon);
            move |_cfg| {
                Ok(Arc::new(KeyValueAlgorithm::new(
                    crate::model::ALGO_PREFIX,
                    Arc::clone(&falcon),
                    HashMap::new(),
                )) as Arc<dyn RetrievalAlgorithm>)
            }
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("alt_names", serde_json::Value::Null, {
            let falcon = Arc::clone(&empty_falcon);
            move |_cfg| {
                Ok(Arc::new(KeyValueAlgorithm::new(
                    crate::model::ALGO_ALT_NAMES,
                    Arc::clone(&falcon),
                    HashMap::new(),
                )) as Arc<dyn RetrievalAlgorithm>)
            }
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("bow", serde_json::Value::Null, |_cfg| {
            let word_algo: Arc<dyn RetrievalAlgorithm> = Arc::new(KeyValueAlgorithm::new(
                crate::model::ALGO_PREFIX,
                Arc::new(MapFalcon::new(HashMap::new())),
                HashMap::new(),
            ));
            Ok(Arc::new(BagOfWordsAlgorithm::new(word_algo, BagOfWordsConfig::default()))
                as Arc<dyn RetrievalAlgorithm>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("attribute", serde_json::Value::Null, |_cfg| {
            let attribute_index: Arc<dyn RetrievalAlgorithm> = Arc::new(KeyValueAlgorithm::new(
                crate::model::ALGO_ATTRIBUTE,
                Arc::new(MapFalcon::new(HashMap::new())),
                HashMap::new(),
            ));
            Ok(Arc::new(AttributeRetriever::new(attribute_index, AttributeRetrieverConfig::default()))
                as Arc<dyn RetrievalAlgorithm>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("fallback", serde_json::Value::Null, |_cfg| {
            Ok(Arc::new(StubAlgorithm::fallback()) as Arc<dyn RetrievalAlgorithm>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("template_expansion", serde_json::Value::Null, |_cfg| {
            Ok(Arc::new(StubAlgorithm::template_expansion()) as Arc<dyn RetrievalAlgorithm>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    registry
        .bind("primary_group", serde_json::Value::Null, |_cfg| {
            let prefix: Arc<dyn RetrievalAlgorithm> = Arc::new(KeyValueAlgorithm::new(
                crate::model::ALGO_PREFIX,
                Arc::new(MapFalcon::new(HashMap::new())),
                HashMap::new(),
            ));
            let bow_word_algo: Arc<dyn RetrievalAlgorithm> = Arc::new(KeyValueAlgorithm::new(
                crate::model::ALGO_PREFIX,
                Arc::new(MapFalcon::new(HashMap::new())),
                HashMap::new(),
            ));
            let bow: Arc<dyn RetrievalAlgorithm> =
                Arc::new(BagOfWordsAlgorithm::new(bow_word_algo, BagOfWordsConfig::default()));
            Ok(Arc::new(AlgorithmGroup::new(AlgorithmGroupConfig {
                children: vec![
                    AlgoChildConfig {
                        algo: prefix,
                        weight: 1.0,
                        op: MergeOp::Max,
                        required: true,
                    },
                    AlgoChildConfig {
                        algo: bow,
                        weight: 1.0,
                        op: MergeOp::Max,
                        required: false,
                    },
                ],
                ..Default::default()
            })) as Arc<dyn RetrievalAlgorithm>)
        })
        .map_err(|e| AppError::RegistryInit(e.to_string()))?;

    Ok(())
}
