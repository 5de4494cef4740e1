use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Keywords that mark a headline as AI-related
const AI_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "ml",
    "deep learning",
    "neural network",
    "llm",
    "gpt",
    "chatgpt",
    "claude",
    "gemini",
    "openai",
    "anthropic",
    "deepmind",
    "transformer",
    "generative ai",
    "gen ai",
    "copilot",
    "large language model",
    "diffusion",
    "stable diffusion",
    "midjourney",
    "computer vision",
    "nlp",
    "robotics",
    "nvidia",
    "tensor",
    "hugging face",
    "mistral",
    "llama",
    "foundation model",
    "ai model",
    "ai agent",
    "rag",
    "retrieval augmented",
    "fine-tuning",
    "prompt engineering",
];

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("sama", "Sam Altman"),
    ("openai", "OpenAI"),
    ("anthropicai", "Anthropic"),
    ("googledeepmind", "Google DeepMind"),
    ("demaboris", "Demis Hassabis"),
    ("ylecun", "Yann LeCun"),
    ("karpathy", "Andrej Karpathy"),
    ("aiatmeta", "AI at Meta"),
    ("ilyasut", "Ilya Sutskever"),
    ("huggingface", "Hugging Face"),
    ("moltbook", "Moltbook"),
    ("bcherny", "Boris Cherny"),
    ("nanobanana", "Nano Banana"),
];

/// Surface form (lower-case) -> canonical label
const KNOWN_ENTITIES: &[(&str, &str)] = &[
    // Companies
    ("openai", "OpenAI"),
    ("anthropic", "Anthropic"),
    ("google", "Google"),
    ("deepmind", "DeepMind"),
    ("meta", "Meta"),
    ("microsoft", "Microsoft"),
    ("nvidia", "NVIDIA"),
    ("apple", "Apple"),
    ("amazon", "Amazon"),
    ("aws", "AWS"),
    ("hugging face", "Hugging Face"),
    ("huggingface", "Hugging Face"),
    ("stability ai", "Stability AI"),
    ("cohere", "Cohere"),
    ("mistral", "Mistral"),
    ("inflection", "Inflection"),
    ("character ai", "Character AI"),
    ("elevenlabs", "ElevenLabs"),
    ("eleven labs", "ElevenLabs"),
    ("runway", "Runway"),
    ("midjourney", "Midjourney"),
    ("adobe", "Adobe"),
    ("salesforce", "Salesforce"),
    ("ibm", "IBM"),
    ("intel", "Intel"),
    ("amd", "AMD"),
    ("tesla", "Tesla"),
    ("xai", "xAI"),
    ("perplexity", "Perplexity"),
    // Products & models
    ("gpt-4", "GPT-4"),
    ("gpt-5", "GPT-5"),
    ("gpt4", "GPT-4"),
    ("gpt5", "GPT-5"),
    ("chatgpt", "ChatGPT"),
    ("claude", "Claude"),
    ("gemini", "Gemini"),
    ("llama", "Llama"),
    ("copilot", "Copilot"),
    ("dall-e", "DALL-E"),
    ("dalle", "DALL-E"),
    ("sora", "Sora"),
    ("stable diffusion", "Stable Diffusion"),
    ("flux", "Flux"),
    ("whisper", "Whisper"),
    ("codex", "Codex"),
    ("claude code", "Claude Code"),
    ("cursor", "Cursor"),
    ("replit", "Replit"),
    ("github copilot", "GitHub Copilot"),
    ("xcode", "Xcode"),
    // People
    ("sam altman", "Sam Altman"),
    ("dario amodei", "Dario Amodei"),
    ("demis hassabis", "Demis Hassabis"),
    ("yann lecun", "Yann LeCun"),
    ("andrej karpathy", "Andrej Karpathy"),
    ("karpathy", "Andrej Karpathy"),
    ("ilya sutskever", "Ilya Sutskever"),
    ("elon musk", "Elon Musk"),
    ("sundar pichai", "Sundar Pichai"),
    ("satya nadella", "Satya Nadella"),
    ("jensen huang", "Jensen Huang"),
    ("mark zuckerberg", "Mark Zuckerberg"),
    // Topics & concepts
    ("funding", "Funding & Investment"),
    ("investment", "Funding & Investment"),
    ("raises", "Funding & Investment"),
    ("valuation", "Funding & Investment"),
    ("series a", "Funding & Investment"),
    ("series b", "Funding & Investment"),
    ("series c", "Funding & Investment"),
    ("ipo", "IPO"),
    ("regulation", "AI Regulation"),
    ("safety", "AI Safety"),
    ("alignment", "AI Alignment"),
    ("misalignment", "AI Alignment"),
    ("ethics", "AI Ethics"),
    ("bias", "AI Ethics"),
    ("autonomous", "Autonomous Systems"),
    ("robotics", "Robotics"),
    ("self-driving", "Autonomous Vehicles"),
    ("autonomous vehicle", "Autonomous Vehicles"),
    ("healthcare", "AI in Healthcare"),
    ("medical", "AI in Healthcare"),
    ("drug discovery", "AI in Healthcare"),
    ("agents", "AI Agents"),
    ("agentic", "AI Agents"),
    ("reasoning", "AI Reasoning"),
    ("chain of thought", "AI Reasoning"),
    ("multimodal", "Multimodal AI"),
    ("vision", "Computer Vision"),
    ("voice", "Voice AI"),
    ("speech", "Voice AI"),
    ("text-to-speech", "Voice AI"),
    ("video", "Video AI"),
    ("text-to-video", "Video AI"),
    ("training", "Model Training"),
    ("fine-tuning", "Model Training"),
    ("inference", "AI Inference"),
    ("deployment", "AI Deployment"),
    ("open source", "Open Source AI"),
    ("open-source", "Open Source AI"),
];

/// Broad thematic labels that should not be used as a cluster heading
/// when a more specific shared entity exists
const GENERIC_TOPICS: &[&str] = &[
    "Funding & Investment",
    "AI Safety",
    "AI Agents",
    "Model Training",
    "AI Reasoning",
];

const STOP_WORDS: &[&str] = &[
    "the", "this", "that", "with", "from", "have", "been", "will", "what", "when", "where",
    "which", "would", "could", "should", "about", "after", "before", "being", "between", "both",
    "each", "more", "most", "other", "some", "such", "than", "then", "these", "they", "through",
    "under", "very", "just", "also", "into", "over", "only", "well", "back", "even", "still",
    "first", "last", "long", "great", "little", "much", "never", "now", "old", "see", "way",
    "who", "come", "make", "like", "time", "know", "take", "people", "year", "good", "give",
    "day", "new", "want", "because", "any", "find", "here", "thing", "think", "say", "she",
    "two", "how", "our", "work", "world", "life", "hand", "part", "child", "eye", "woman",
    "place", "case", "week", "company", "system", "program", "question", "government",
    "number", "night", "point", "home", "water", "room", "mother", "area", "money", "story",
    "fact", "month", "different", "right", "study", "book", "word", "business", "issue", "side",
    "kind", "head", "house", "service", "friend", "father", "power", "hour", "game", "line",
    "end", "member", "law", "car", "city", "community", "name", "president", "team", "minute",
    "idea", "body", "information", "today", "read", "thread", "finding", "view",
];

/// Vocabulary used to turn free text into topic labels.
///
/// Built once at startup (either [`EntityDictionary::default`] or a JSON file
/// loaded with [`EntityDictionary::from_path`]) and handed to the extractor,
/// clusterer and filters explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDictionary {
    /// Lower-case surface form -> canonical label
    pub entities: BTreeMap<String, String>,
    /// Lower-case words never promoted to ad-hoc entities
    pub stop_words: BTreeSet<String>,
    /// Labels de-prioritised when choosing a cluster heading
    pub generic_topics: BTreeSet<String>,
    pub ai_keywords: Vec<String>,
    /// Lower-case username -> display name
    pub display_names: BTreeMap<String, String>,
}

impl Default for EntityDictionary {
    fn default() -> Self {
        Self {
            entities: KNOWN_ENTITIES
                .iter()
                .map(|(form, label)| (form.to_string(), label.to_string()))
                .collect(),
            stop_words: STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            generic_topics: GENERIC_TOPICS.iter().map(|t| t.to_string()).collect(),
            ai_keywords: AI_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            display_names: DISPLAY_NAMES
                .iter()
                .map(|(user, name)| (user.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl EntityDictionary {
    /// Dictionary with only the given surface forms and no stop words,
    /// generic topics, keywords or display names.
    pub fn with_entities<I, F, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (F, L)>,
        F: Into<String>,
        L: Into<String>,
    {
        Self {
            entities: entries
                .into_iter()
                .map(|(form, label)| (form.into().to_lowercase(), label.into()))
                .collect(),
            stop_words: BTreeSet::new(),
            generic_topics: BTreeSet::new(),
            ai_keywords: Vec::new(),
            display_names: BTreeMap::new(),
        }
    }

    /// Load a dictionary from JSON. Keys missing from the file keep their
    /// built-in defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dictionary file: {}", path.display()))?;

        let mut dictionary: EntityDictionary = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse dictionary JSON from {}. Expected an object with entities, stop_words, generic_topics, ai_keywords and display_names.",
                path.display()
            )
        })?;

        dictionary.normalize_case();
        Ok(dictionary)
    }

    pub fn display_name(&self, username: &str) -> Option<&str> {
        self.display_names
            .get(&username.to_lowercase())
            .map(|s| s.as_str())
    }

    // Matching is done against lower-cased text, so every lookup key must be
    // lower-case as well.
    fn normalize_case(&mut self) {
        self.entities = std::mem::take(&mut self.entities)
            .into_iter()
            .map(|(form, label)| (form.to_lowercase(), label))
            .collect();
        self.stop_words = std::mem::take(&mut self.stop_words)
            .into_iter()
            .map(|w| w.to_lowercase())
            .collect();
        self.display_names = std::mem::take(&mut self.display_names)
            .into_iter()
            .map(|(user, name)| (user.to_lowercase(), name))
            .collect();
        for keyword in &mut self.ai_keywords {
            *keyword = keyword.to_lowercase();
        }
    }
}
