//! Curated classic papers, one of which is shown in every digest.

use crate::categories::CategoryFilter;
use crate::models::{CandidateItem, ItemDetails, SourceType};
use chrono::{Datelike, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{info, instrument, warn};

const SOURCE_NAME: &str = "Classic papers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicPaper {
    pub title: &'static str,
    pub authors: &'static str,
    pub year: &'static str,
    pub url: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub keywords: &'static [&'static str],
}

macro_rules! classic {
    ($category:literal, $title:literal, $authors:literal, $year:literal, $url:literal, $description:literal, [$($kw:literal),* $(,)?]) => {
        ClassicPaper {
            title: $title,
            authors: $authors,
            year: $year,
            url: $url,
            description: $description,
            category: $category,
            keywords: &[$($kw),*],
        }
    };
}

pub const CATALOG: &[ClassicPaper] = &[
    classic!("reinforcement_learning", "Reinforcement Learning: An Introduction (2nd Edition)",
        "Richard S. Sutton, Andrew G. Barto", "2018",
        "https://mitpress.mit.edu/books/reinforcement-learning-second-edition",
        "The standard text of the field, covering the theory behind RL from temporal-difference learning to policy gradients.",
        ["reinforcement learning", "temporal difference", "Q-learning", "policy gradient", "value function", "exploration"]),
    classic!("reinforcement_learning", "Human-level control through deep reinforcement learning",
        "Mnih et al. (DeepMind)", "2015", "https://www.nature.com/articles/nature14236",
        "The DQN paper: end-to-end deep RL reaching human-level control on Atari games.",
        ["DQN", "deep RL", "Q-learning", "atari games", "convolutional neural network"]),
    classic!("reinforcement_learning", "Policy Gradient Methods for Reinforcement Learning with Function Approximation",
        "Sutton, McAllester, Singh, Mansour", "2000",
        "https://proceedings.neurips.cc/paper/2000/file/461271028c68e8f25be1b2a2fb309df9-Paper.pdf",
        "Theoretical foundation of policy gradient methods, including a convergence proof under function approximation.",
        ["policy gradient", "function approximation", "actor-critic", "convergence"]),
    classic!("reinforcement_learning", "Asynchronous Methods for Deep Reinforcement Learning",
        "Mnih et al. (DeepMind)", "2016", "https://arxiv.org/abs/1602.01783",
        "A3C: asynchronous actor-critic training that made large-scale parallel RL practical.",
        ["A3C", "asynchronous", "actor-critic", "distributed RL", "parallel"]),
    classic!("reinforcement_learning", "Proximal Policy Optimization Algorithms (PPO)",
        "Schulman et al. (OpenAI)", "2017", "https://arxiv.org/abs/1707.06347",
        "PPO balances sample complexity against implementation simplicity and became one of the most widely used RL algorithms.",
        ["PPO", "trust region", "policy optimization", "clipped surrogate", "sample efficiency"]),
    classic!("reinforcement_learning", "Policy Invariance Under Reward Transformations: Theory and Application to Reward Shaping",
        "Ng, Harada, Russell (UC Berkeley)", "1999",
        "https://people.eecs.berkeley.edu/~pabbeel/cs287/npapers/99-shaping.pdf",
        "Shows how to shape rewards without changing the optimal policy, via potential-based shaping.",
        ["reward shaping", "potential-based reward", "reward hypothesis", "optimal policy"]),
    classic!("alignment", "Concrete Problems in AI Safety",
        "Amodei et al. (OpenAI)", "2016", "https://arxiv.org/abs/1606.06565",
        "Lays out concrete AI safety problems: negative side effects, reward hacking, scalable oversight and safe exploration.",
        ["AI safety", "reward hacking", "side effects", "scalable oversight", "safe exploration"]),
    classic!("alignment", "Scalable Agent Alignment via Reward Modeling",
        "Leike et al. (DeepMind)", "2018", "https://arxiv.org/abs/1811.07871",
        "One of the foundations of RLHF: aligning agent behaviour by learning a reward model from human feedback.",
        ["RLHF", "reward modeling", "human feedback", "agent alignment", "preference learning"]),
    classic!("alignment", "Training a Helpful and Harmless Assistant with Reinforcement Learning from Human Feedback",
        "Bai et al. (Anthropic)", "2022", "https://arxiv.org/abs/2204.05862",
        "Anthropic's HH-RLHF work, training an assistant that is both helpful and harmless.",
        ["RLHF", "constitutional AI", "harmlessness", "helpfulness", "HHH"]),
    classic!("alignment", "Language Models are Few-Shot Learners",
        "Brown et al. (OpenAI)", "2020", "https://arxiv.org/abs/2005.14165",
        "GPT-3 and in-context learning, which reshaped the questions alignment research asks of large models.",
        ["GPT-3", "few-shot learning", "in-context learning", "language models", "scaling laws"]),
    classic!("alignment", "Prima Facie Approximations of Value Learning",
        "Uehara et al.", "2020", "https://arxiv.org/abs/2010.08519",
        "Foundational analysis of value learning and the reward hacking problem.",
        ["value learning", "reward hacking", "preference learning", "approximation"]),
    classic!("ai4math", "Solving Olympiad Geometry without Human Demonstrations",
        "Trinh et al. (Google DeepMind)", "2024", "https://nature.com/articles/s41586-024-08067-6",
        "AlphaGeometry reaches olympiad gold-medal level on geometry problems using synthetic training data.",
        ["AlphaGeometry", "theorem proving", "geometry", "mathematical reasoning", "synthetic data"]),
    classic!("ai4math", "Advancing Mathematics by Guiding Large Language Models",
        "Tao et al.", "2024", "https://arxiv.org/abs/2312.06761",
        "Using LLMs as assistants in mathematical research and discovery.",
        ["LLM for math", "mathematical discovery", "formal proof", "computer algebra"]),
    classic!("ai4math", "Neural Theorem Provers: An Update",
        "Polu et al.", "2022", "https://arxiv.org/abs/2209.05777",
        "Progress report on neural theorem proving, including proofs in Lean.",
        ["theorem proving", "formal verification", "Lean", "tactics", "mathlib"]),
    classic!("ai4math", "Mathematical Reasoning with Lean 4",
        "Ullrich et al.", "2024", "https://arxiv.org/abs/2312.06483",
        "Recent work on mathematical reasoning and proof automation in Lean 4.",
        ["Lean 4", "mathematical reasoning", "formal proof assistant", "proof automation"]),
    classic!("formal_verification", "Communicating Sequential Processes",
        "Tony Hoare", "1978", "https://www.cs.ox.ac.uk/files/3328/CSP.pdf",
        "CSP describes the communication behaviour of concurrent systems and underpins much of formal verification.",
        ["CSP", "concurrency", "process algebra", "formal methods", "channels"]),
    classic!("formal_verification", "Design and Synthesis of Synchronization Skeletons Using Branching Time Temporal Logic",
        "Clarke, Emerson", "1981", "https://doi.org/10.1145/322186.322201",
        "Introduces CTL model checking for verifying properties of finite-state systems.",
        ["CTL", "model checking", "temporal logic", "verification", "state space"]),
    classic!("formal_verification", "Model Checking",
        "Clarke, Grumberg, Peled", "1999", "https://mitpress.mit.edu/books/model-checking/",
        "The classic textbook on the theory and practice of model checking.",
        ["model checking", "temporal logic", "verification", "SPIN model checker"]),
    classic!("formal_verification", "The Temporal Logic of Reactive and Concurrent Systems: Specification",
        "Manna, Pnueli", "1992", "https://mitpress.mit.edu/books/temporal-logic/",
        "Temporal logic for specifying and verifying reactive and concurrent systems.",
        ["temporal logic", "reactive systems", "concurrency", "specification", "verification"]),
    classic!("llm", "Attention Is All You Need",
        "Vaswani et al.", "2017", "https://arxiv.org/abs/1706.03762",
        "The Transformer: self-attention replaces recurrence and reshapes NLP and beyond.",
        ["Transformer", "self-attention", "attention mechanism", "encoder-decoder", "multi-head attention"]),
    classic!("llm", "Language Models are Few-Shot Learners",
        "Brown et al. (OpenAI)", "2020", "https://arxiv.org/abs/2005.14165",
        "GPT-3 demonstrates emergent few-shot abilities of large language models.",
        ["GPT-3", "few-shot learning", "in-context learning", "emergent abilities", "scaling"]),
    classic!("llm", "Constitutional AI: Harmlessness from AI Feedback",
        "Bai et al. (Anthropic)", "2022", "https://arxiv.org/abs/2212.08073",
        "Training harmless assistants from AI feedback guided by a written constitution.",
        ["constitutional AI", "AI feedback", "harmlessness", "RLAIF", "critic"]),
    classic!("llm", "Training Language Models to Follow Instructions with Human Feedback",
        "Ouyang et al. (OpenAI)", "2022", "https://arxiv.org/abs/2203.02155",
        "InstructGPT: fine-tuning with human feedback makes models follow instructions.",
        ["InstructGPT", "instruction following", "RLHF", "fine-tuning", "human feedback"]),
    classic!("data_engineering", "DataComp: In search of the next generation of multimodal datasets",
        "Gadre et al. (UW, Google, LAION)", "2023", "https://arxiv.org/abs/2304.14108",
        "A benchmark for dataset construction that measures how filtering strategies affect CLIP training.",
        ["data curation", "CLIP", "data filtering", "multimodal dataset", "benchmark"]),
    classic!("data_engineering", "The Pile: An 800GB Dataset of Diverse Text for Language Modeling",
        "Gao et al. (EleutherAI)", "2020", "https://arxiv.org/abs/2101.00027",
        "An open pre-training corpus of 22 diverse subsets that fuelled the open LLM ecosystem.",
        ["pre-training data", "dataset construction", "data diversity", "language modeling", "open source"]),
    classic!("data_engineering", "Data-centric Artificial Intelligence: A Survey",
        "Zha et al.", "2023", "https://arxiv.org/abs/2303.10158",
        "Survey of data-centric AI covering collection, labelling, cleaning and quality assessment.",
        ["data-centric AI", "data quality", "data annotation", "data augmentation", "data management"]),
    classic!("data_engineering", "Scaling Data-Constrained Language Models",
        "Muennighoff et al. (BigScience)", "2023", "https://arxiv.org/abs/2305.16264",
        "Training strategies when data is limited: repeated epochs remain useful up to a point.",
        ["data scaling", "data repetition", "sample efficiency", "scaling laws", "data-constrained"]),
    classic!("data_engineering", "D4: Improving LLM Pretraining via Document De-Duplication and Diversification",
        "Tirumala et al. (Meta)", "2023", "https://arxiv.org/abs/2308.12284",
        "Document-level deduplication and diversification that measurably improve pre-training data.",
        ["deduplication", "data diversity", "pre-training data", "data quality", "data pipeline"]),
    classic!("multimodal", "Learning Transferable Visual Models From Natural Language Supervision (CLIP)",
        "Radford et al. (OpenAI)", "2021", "https://arxiv.org/abs/2103.00020",
        "CLIP learns visual representations from natural language and excels at zero-shot classification.",
        ["CLIP", "vision-language", "contrastive learning", "zero-shot", "image-text alignment"]),
    classic!("multimodal", "Visual Instruction Tuning (LLaVA)",
        "Liu et al. (UW, Microsoft)", "2023", "https://arxiv.org/abs/2304.08485",
        "LLaVA brings instruction tuning to vision-language models with a simple, efficient recipe.",
        ["LLaVA", "visual instruction tuning", "VLM", "multimodal LLM", "instruction following"]),
    classic!("multimodal", "Flamingo: a Visual Language Model for Few-Shot Learning",
        "Alayrac et al. (DeepMind)", "2022", "https://arxiv.org/abs/2204.14198",
        "Cross-attention fuses vision and language for strong multimodal few-shot learning.",
        ["Flamingo", "few-shot learning", "cross-attention", "vision-language model", "multimodal"]),
    classic!("multimodal", "InternVL: Scaling up Vision Foundation Models and Aligning for Generic Visual-Linguistic Tasks",
        "Chen et al. (Shanghai AI Lab)", "2024", "https://arxiv.org/abs/2312.14238",
        "Scales a vision foundation model to 6B parameters and aligns it with an LLM.",
        ["InternVL", "vision foundation model", "VLM", "visual-linguistic", "scaling"]),
    classic!("scaling_laws", "Scaling Laws for Neural Language Models",
        "Kaplan et al. (OpenAI)", "2020", "https://arxiv.org/abs/2001.08361",
        "Power-law relationships between model size, data, compute and loss.",
        ["scaling laws", "power law", "compute-optimal", "language models", "neural scaling"]),
    classic!("scaling_laws", "Training Compute-Optimal Large Language Models (Chinchilla)",
        "Hoffmann et al. (DeepMind)", "2022", "https://arxiv.org/abs/2203.15556",
        "Chinchilla revises earlier scaling laws and shows that training data had been badly underweighted.",
        ["Chinchilla", "compute-optimal", "scaling laws", "data scaling", "training efficiency"]),
    classic!("scaling_laws", "Scaling Laws for Autoregressive Generative Modeling",
        "Henighan et al. (OpenAI)", "2020", "https://arxiv.org/abs/2010.14701",
        "Extends scaling laws to generative models across text, images and video.",
        ["scaling laws", "generative models", "multimodal", "autoregressive", "cross-modal scaling"]),
    classic!("information_theory", "A Mathematical Theory of Communication",
        "Claude E. Shannon", "1948",
        "https://people.math.harvard.edu/~ctm/home/text/others/shannon1948.pdf",
        "Defines entropy and mutual information; the basis of digital communication and of many ML loss functions.",
        ["information theory", "entropy", "mutual information", "channel capacity", "coding theory"]),
    classic!("information_theory", "The Information Bottleneck Method",
        "Tishby, Pereira, Bialek", "2000", "https://arxiv.org/abs/physics/0004057",
        "Compression-based view of relevant information, later used to study representation learning.",
        ["information bottleneck", "representation learning", "compression", "mutual information", "minimal sufficient statistic"]),
];

/// Neighbouring fields shown next to a classic pick.
pub fn related_categories(category: &str) -> &'static [&'static str] {
    match category {
        "reinforcement_learning" => &["llm", "agents", "alignment"],
        "alignment" => &["llm", "reinforcement_learning"],
        "ai4math" => &["llm", "reasoning"],
        "formal_verification" => &["ai4math", "reasoning"],
        "llm" => &["alignment", "reasoning", "scaling_laws"],
        "data_engineering" => &["scaling_laws", "llm", "multimodal"],
        "multimodal" => &["data_engineering", "llm", "scaling_laws"],
        "scaling_laws" => &["llm", "data_engineering"],
        _ => &[],
    }
}

impl ClassicPaper {
    pub fn to_candidate(&self) -> CandidateItem {
        CandidateItem {
            source_type: SourceType::Classic,
            source_name: SOURCE_NAME.to_string(),
            title: self.title.to_string(),
            url: self.url.to_string(),
            published_at: None,
            body_text: Some(format!(
                "{} Key concepts: {}.",
                self.description,
                self.keywords.join(", ")
            )),
            matched_categories: Vec::new(),
            details: ItemDetails::Classic {
                authors: self.authors.to_string(),
                year: self.year.to_string(),
                category: self.category.to_string(),
                description: self.description.to_string(),
                keywords: self.keywords.iter().map(|k| k.to_string()).collect(),
            },
        }
    }
}

/// Catalog entries for `categories`, in category order then catalog order.
pub fn pool(categories: &[String]) -> Vec<CandidateItem> {
    categories
        .iter()
        .flat_map(|category| {
            let papers: Vec<_> = CATALOG
                .iter()
                .filter(|p| p.category == category.as_str())
                .collect();
            if papers.is_empty() {
                warn!(%category, "No classic papers for category");
            }
            papers
        })
        .map(ClassicPaper::to_candidate)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub categories: Vec<String>,
    /// Pick by calendar day instead of at random.
    pub daily: bool,
}

/// Same pick for the whole of `date`, moving one entry forward each day.
pub fn pick_daily(pool: &[CandidateItem], date: NaiveDate) -> Option<CandidateItem> {
    if pool.is_empty() {
        return None;
    }
    let day = usize::try_from(date.num_days_from_ce()).unwrap_or_default();
    pool.get(day % pool.len()).cloned()
}

pub fn pick_random<R: Rng + ?Sized>(pool: &[CandidateItem], rng: &mut R) -> Option<CandidateItem> {
    pool.choose(rng).cloned()
}

/// Choose today's classic pick from the filtered pool.
#[instrument(level = "info", skip_all, fields(daily = settings.daily))]
pub fn select_classic<R: Rng + ?Sized>(
    settings: &Settings,
    filter: &CategoryFilter,
    today: NaiveDate,
    rng: &mut R,
) -> Option<CandidateItem> {
    let candidates = filter.apply(pool(&settings.categories));
    let pick = if settings.daily {
        pick_daily(&candidates, today)
    } else {
        pick_random(&candidates, rng)
    };
    match &pick {
        Some(item) => info!(title = %item.title, pool = candidates.len(), "Selected classic paper"),
        None => warn!("No classic paper matches the active categories"),
    }
    pick
}
