/*!
 * User interaction boundary.
 *
 * The pipeline never prompts by itself. It raises typed requests (stream
 * choice, tag decisions, scrub confirmations) and a `DecisionProvider`
 * answers them: the console prompter asks the user, the automatic decider
 * takes the safe defaults for unattended runs.
 */

use dialoguer::{Confirm, MultiSelect, Select};
use log::{debug, info};

use crate::errors::{SelectionError, SyncError};
use crate::scrubber::ScrubDecisionRequest;
use crate::selection::AmbiguousSide;
use crate::tag_rules::{TagDecision, TagDecisionRequest, TagRef};

/// Answers the questions raised while processing a pair
pub trait DecisionProvider: Send {
    /// Index of the candidate to use on an ambiguous side
    fn choose_stream(&mut self, side: &AmbiguousSide) -> Result<usize, SelectionError>;

    /// Keep/drop decision for every requested tag
    fn decide_tags(&mut self, requests: &[TagDecisionRequest]) -> Result<Vec<(TagRef, TagDecision)>, SyncError>;

    /// Whether to enable a scrub category
    fn confirm_scrub(&mut self, request: &ScrubDecisionRequest) -> Result<bool, SyncError>;
}

/// Interactive prompts on the terminal
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    pub fn new() -> Self {
        Self
    }
}

fn prompt_error(e: dialoguer::Error) -> SyncError {
    SyncError::Interaction(e.to_string())
}

impl DecisionProvider for ConsolePrompter {
    fn choose_stream(&mut self, side: &AmbiguousSide) -> Result<usize, SelectionError> {
        let items: Vec<String> = side.candidates.iter().map(|c| c.to_string()).collect();

        Select::new()
            .with_prompt(format!("Which {} subtitle stream should be used?", side.side))
            .items(&items)
            .default(side.suggested)
            .interact_opt()
            .map_err(|_| SelectionError::Cancelled)?
            .ok_or(SelectionError::Cancelled)
    }

    fn decide_tags(&mut self, requests: &[TagDecisionRequest]) -> Result<Vec<(TagRef, TagDecision)>, SyncError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        println!("Unknown styles and tags (lines carrying them are kept unless dropped here):");
        for request in requests {
            println!("  {}", request);
            for example in &request.examples {
                println!("      {}", example);
            }
        }

        let items: Vec<String> = requests.iter().map(|r| r.to_string()).collect();
        let defaults = vec![true; requests.len()];
        let kept = MultiSelect::new()
            .with_prompt("Select the tags that mark dialogue (space to toggle)")
            .items(&items)
            .defaults(&defaults)
            .interact_opt()
            .map_err(prompt_error)?
            .unwrap_or_else(|| (0..requests.len()).collect());

        Ok(requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                let decision = if kept.contains(&index) { TagDecision::Keep } else { TagDecision::Drop };
                (request.tag.clone(), decision)
            })
            .collect())
    }

    fn confirm_scrub(&mut self, request: &ScrubDecisionRequest) -> Result<bool, SyncError> {
        println!("{} lines contain {}:", request.matches, request.category);
        for sample in &request.samples {
            println!("  {}", sample);
        }

        Confirm::new()
            .with_prompt(format!("Remove {} from the aligner input?", request.category))
            .default(true)
            .interact()
            .map_err(prompt_error)
    }
}

/// Non-interactive answers: suggested streams, keep tags, scrub everything
#[derive(Debug, Default)]
pub struct AutoDecider;

impl AutoDecider {
    pub fn new() -> Self {
        Self
    }
}

impl DecisionProvider for AutoDecider {
    fn choose_stream(&mut self, side: &AmbiguousSide) -> Result<usize, SelectionError> {
        info!("Using suggested {} stream {}", side.side, side.suggested);
        Ok(side.suggested)
    }

    fn decide_tags(&mut self, requests: &[TagDecisionRequest]) -> Result<Vec<(TagRef, TagDecision)>, SyncError> {
        Ok(requests
            .iter()
            .map(|request| {
                debug!("Keeping lines with {}", request.tag);
                (request.tag.clone(), TagDecision::Keep)
            })
            .collect())
    }

    fn confirm_scrub(&mut self, request: &ScrubDecisionRequest) -> Result<bool, SyncError> {
        debug!("Scrubbing {} ({} lines)", request.category, request.matches);
        Ok(true)
    }
}
