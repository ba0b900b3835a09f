//! Local harness: drives synthetic envelopes through the skill
//!
//! Sends a launch request, then one chat request per `--query`, carrying the
//! session attributes from each response into the next request.

use crate::config::SkillConfig;
use crate::skill::{Intent, Request, RequestEnvelope, ResponseEnvelope, Session, Skill};
use clap::Args;

const SESSION_ID: &str = "amzn1.echo-api.session.mock";

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Question to ask; repeat for a multi-turn session
    #[arg(
        short,
        long = "query",
        default_values = ["What is the capital of France?", "What is its population?"]
    )]
    queries: Vec<String>,

    /// Override MAX_RESPONSE_WORDS for this run
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    words: Option<u32>,

    /// Finish with a stop intent
    #[arg(long)]
    stop: bool,

    /// Print full response envelopes instead of just the speech
    #[arg(long)]
    json: bool,
}

pub async fn run(
    mut config: SkillConfig,
    args: SimulateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(words) = args.words {
        config.settings.max_response_words = words;
    }
    if !config.endpoint.has_key() {
        println!("WARNING: GOOGLE_API_KEY not found in environment. API calls will fail.");
    }

    let skill = Skill::from_config(&config)?;

    println!("--- Starting Simulation ---");
    println!("\n[1] LaunchRequest");
    let mut session = Session {
        new: true,
        session_id: SESSION_ID.to_string(),
        ..Session::default()
    };
    let response = skill
        .handle(RequestEnvelope::new(session.clone(), Request::launch()))
        .await;
    report(&response, args.json)?;
    session.new = false;
    session.attributes = response.session_attributes;

    let mut step = 2;
    for query in &args.queries {
        println!("\n[{step}] ChatIntent ({query})");
        let request = Request::intent(Intent::new("ChatIntent").with_slot("query", query.as_str()));
        let response = skill
            .handle(RequestEnvelope::new(session.clone(), request))
            .await;
        report(&response, args.json)?;
        session.attributes = response.session_attributes;
        step += 1;
    }

    if args.stop {
        println!("\n[{step}] AMAZON.StopIntent");
        let request = Request::intent(Intent::new("AMAZON.StopIntent"));
        let response = skill.handle(RequestEnvelope::new(session, request)).await;
        report(&response, args.json)?;
    }

    println!("\n--- Simulation Complete ---");
    Ok(())
}

fn report(response: &ResponseEnvelope, full: bool) -> Result<(), serde_json::Error> {
    if full {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        let speech = response
            .response
            .output_speech
            .as_ref()
            .map_or("<no speech>", |s| s.ssml.as_str());
        println!("Response Output Speech: {speech}");
    }
    Ok(())
}
