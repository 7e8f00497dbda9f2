//! Synthetic A/B traffic.
//!
//! Generates the event stream and feedback a real page would collect:
//! a shuffled, balanced queue of visits, each converting with its version's
//! rate, and converters sometimes leaving a comment, a star rating and tags.
//! Time is sampled, never waited on, so a run is instant and, with a seed,
//! reproducible.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analytics::contingency::{DEFAULT_LABEL_A, DEFAULT_LABEL_B};
use crate::etl::events::{PAGE_VIEW_EVENT, PURCHASE_CLICK_EVENT};
use crate::etl::{EventRecord, FeedbackRecord};
use crate::{Error, Result};

pub const DEFAULT_VISITORS_PER_VERSION: u64 = 500;
pub const DEFAULT_CONVERSION_RATE_A: f64 = 0.03;
pub const DEFAULT_CONVERSION_RATE_B: f64 = 0.05;
pub const DEFAULT_COMMENT_PROBABILITY: f64 = 0.68;

const HESITATION_SECS: (f64, f64) = (2.0, 10.0);
const PAGE_LOAD_SECS: (f64, f64) = (0.3, 1.5);
const BETWEEN_VISITS_SECS: (f64, f64) = (3.0, 10.0);

const COMMENTS_A: &[&str] = &[
    "The blue button is okay, I guess.",
    "Didn't really notice the button color.",
    "It's just a button.",
    "Felt a bit hard to see the button against the background.",
];

const COMMENTS_B: &[&str] = &[
    "Wow, the green button really pops! Very clear.",
    "I love the new green color, it's very inviting.",
    "The green button made it easy to know where to click.",
    "This design looks much more professional and trustworthy.",
];

const TAGS_A: &[&str] = &["confusing", "hard_to_see", "plain_design"];
const TAGS_B: &[&str] = &[
    "clear_call_to_action",
    "good_design",
    "easy_to_use",
    "trustworthy",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36 Edg/118.0.2088.69",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/118.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-A536U) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_0_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
];

/// Which side of the test a visit was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arm {
    A,
    B,
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub visitors_per_version: u64,
    pub conversion_rate_a: f64,
    pub conversion_rate_b: f64,
    /// Chance that a converting visitor leaves feedback.
    pub comment_probability: f64,
    pub seed: Option<u64>,
    pub label_a: String,
    pub label_b: String,
    pub started_at: DateTime<Utc>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            visitors_per_version: DEFAULT_VISITORS_PER_VERSION,
            conversion_rate_a: DEFAULT_CONVERSION_RATE_A,
            conversion_rate_b: DEFAULT_CONVERSION_RATE_B,
            comment_probability: DEFAULT_COMMENT_PROBABILITY,
            seed: None,
            label_a: DEFAULT_LABEL_A.to_string(),
            label_b: DEFAULT_LABEL_B.to_string(),
            started_at: Utc::now(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("conversion_rate_a", self.conversion_rate_a),
            ("conversion_rate_b", self.conversion_rate_b),
            ("comment_probability", self.comment_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.label_a == self.label_b {
            return Err(Error::InvalidInput(format!(
                "version labels must differ, both are '{}'",
                self.label_a
            )));
        }
        Ok(())
    }

    fn label(&self, arm: Arm) -> &str {
        match arm {
            Arm::A => &self.label_a,
            Arm::B => &self.label_b,
        }
    }

    fn conversion_rate(&self, arm: Arm) -> f64 {
        match arm {
            Arm::A => self.conversion_rate_a,
            Arm::B => self.conversion_rate_b,
        }
    }
}

/// One simulated visit, as the visitor log would record it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedVisit {
    pub user_pseudo_id: String,
    pub arm: Arm,
    pub user_agent: String,
    pub converted: bool,
    pub time_to_convert_seconds: Option<f64>,
    pub left_feedback: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedTraffic {
    pub visits: Vec<SimulatedVisit>,
    pub events: Vec<EventRecord>,
    pub feedback: Vec<FeedbackRecord>,
}

impl SimulatedTraffic {
    pub fn conversions(&self, arm: Arm) -> u64 {
        self.visits
            .iter()
            .filter(|v| v.arm == arm && v.converted)
            .count() as u64
    }

    pub fn visitors(&self, arm: Arm) -> u64 {
        self.visits.iter().filter(|v| v.arm == arm).count() as u64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn offset(seconds: f64) -> Duration {
    Duration::milliseconds((seconds * 1000.0).round() as i64)
}

fn feedback_for<R: Rng>(rng: &mut R, arm: Arm) -> (String, u8, Vec<String>) {
    let (comments, tags, stars) = match arm {
        Arm::A => (COMMENTS_A, TAGS_A, 1..=3),
        Arm::B => (COMMENTS_B, TAGS_B, 3..=5),
    };
    let comment = comments.choose(rng).copied().unwrap_or_default().to_string();
    let star_rating = rng.gen_range(stars);
    let k = rng.gen_range(1..=tags.len());
    let chosen = tags
        .choose_multiple(rng, k)
        .map(|t| t.to_string())
        .collect();
    (comment, star_rating, chosen)
}

/// Run the simulation.
pub fn simulate(config: &SimulationConfig) -> Result<SimulatedTraffic> {
    config.validate()?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let per_version = config.visitors_per_version as usize;
    let mut queue: Vec<Arm> = std::iter::repeat(Arm::A)
        .take(per_version)
        .chain(std::iter::repeat(Arm::B).take(per_version))
        .collect();
    queue.shuffle(&mut rng);

    let total = queue.len();
    info!(
        visits = total,
        seed = ?config.seed,
        "Starting traffic simulation"
    );

    let mut traffic = SimulatedTraffic::default();
    let mut clock = config.started_at;

    for (i, arm) in queue.into_iter().enumerate() {
        let label = config.label(arm);
        let user_id = uuid::Builder::from_random_bytes(rng.gen())
            .into_uuid()
            .to_string();
        let user_agent = USER_AGENTS.choose(&mut rng).copied().unwrap_or_default();

        debug!(visitor = i + 1, total, version = label, "Visit");

        let mut page_view = EventRecord::new(user_id.clone(), PAGE_VIEW_EVENT, Some(label));
        page_view.timestamp = Some(clock);
        traffic.events.push(page_view);

        let load = rng.gen_range(PAGE_LOAD_SECS.0..PAGE_LOAD_SECS.1);
        let hesitation = rng.gen_range(HESITATION_SECS.0..HESITATION_SECS.1);
        let converted = rng.gen_bool(config.conversion_rate(arm));

        let mut time_to_convert = None;
        let mut left_feedback = false;
        if converted {
            let elapsed = round2(load + hesitation);
            let clicked_at = clock + offset(elapsed);
            let mut click = EventRecord::new(user_id.clone(), PURCHASE_CLICK_EVENT, Some(label));
            click.timestamp = Some(clicked_at);
            traffic.events.push(click);
            time_to_convert = Some(elapsed);

            if rng.gen_bool(config.comment_probability) {
                let (comment_text, star_rating, tags) = feedback_for(&mut rng, arm);
                debug!(star_rating, ?tags, "Feedback left");
                traffic.feedback.push(FeedbackRecord {
                    user_pseudo_id: user_id.clone(),
                    test_version: label.to_string(),
                    comment_text,
                    star_rating,
                    tags,
                    time_to_convert_seconds: elapsed,
                    timestamp: Some(clicked_at),
                });
                left_feedback = true;
            }
        }

        traffic.visits.push(SimulatedVisit {
            user_pseudo_id: user_id,
            arm,
            user_agent: user_agent.to_string(),
            converted,
            time_to_convert_seconds: time_to_convert,
            left_feedback,
        });

        let pause = rng.gen_range(BETWEEN_VISITS_SECS.0..BETWEEN_VISITS_SECS.1);
        clock += offset(load + hesitation + pause);
    }

    info!(
        conversions_a = traffic.conversions(Arm::A),
        conversions_b = traffic.conversions(Arm::B),
        feedback = traffic.feedback.len(),
        "Simulation complete"
    );

    Ok(traffic)
}
