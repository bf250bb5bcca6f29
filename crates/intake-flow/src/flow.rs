//! The intake dialogue state machine.

use chrono::NaiveDateTime;
use database::{conversation, vehicle, Database, IntakeState, Vehicle};
use tracing::{debug, info};

use crate::error::FlowError;
use crate::messages;
use crate::parse;

/// Fields captured by a completed intake, ready for request creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedIntake {
    pub conversation_id: i64,
    pub plate: String,
    pub vehicle_id: Option<i64>,
    pub problem: String,
    pub photos: Vec<String>,
}

/// Outcome of processing one inbound message.
#[derive(Debug, Clone)]
pub struct FlowResponse {
    /// Reply to send back to the driver.
    pub reply: String,
    /// Dialogue step after this message.
    pub state: IntakeState,
    /// Present when the driver confirmed and the intake finished.
    pub completed: Option<CompletedIntake>,
}

impl FlowResponse {
    fn step(reply: String, state: IntakeState) -> Self {
        Self {
            reply,
            state,
            completed: None,
        }
    }
}

/// The guided intake dialogue engine.
///
/// One instance serves all conversations; per-phone state lives in the
/// conversation row. The engine only reads vehicles and writes conversation
/// progress — creating the request from a [`CompletedIntake`] is the
/// caller's job, as is delivering the reply.
#[derive(Debug, Clone)]
pub struct IntakeFlow {
    db: Database,
}

impl IntakeFlow {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Advance the dialogue for `phone` with one inbound message.
    ///
    /// Every call persists the conversation (the last-message timestamp
    /// drives staleness), except the completion branch: the captured fields
    /// are returned and the conversation is left untouched until the caller
    /// has created the request and confirms via
    /// [`database::conversation::complete_intake`].
    pub async fn process(
        &self,
        phone: &str,
        text: &str,
        photos: &[String],
        now: NaiveDateTime,
    ) -> Result<FlowResponse, FlowError> {
        let conv = conversation::get_or_create(self.db.pool(), phone, None, now).await?;
        let state = conv.intake.0.clone();

        debug!("Processing message from {} in step {:?}", phone, state);

        let response = match state {
            IntakeState::Initial => {
                if parse::is_intake_intent(text) {
                    conversation::record_greeting(self.db.pool(), conv.id, now).await?;
                    FlowResponse::step(messages::welcome(), IntakeState::AwaitingPlate)
                } else {
                    FlowResponse::step(messages::help(), IntakeState::Initial)
                }
            }

            IntakeState::AwaitingPlate => match parse::extract_plate(text) {
                Some(plate) => {
                    let known = vehicle::find_by_plate(self.db.pool(), &plate).await?;
                    match known {
                        Some(v) => FlowResponse::step(
                            messages::vehicle_found(&v),
                            IntakeState::AwaitingProblem {
                                plate: v.plate.clone(),
                                vehicle_id: Some(v.id),
                            },
                        ),
                        None => FlowResponse::step(
                            messages::plate_not_registered(&plate),
                            IntakeState::AwaitingProblem {
                                plate,
                                vehicle_id: None,
                            },
                        ),
                    }
                }
                None => FlowResponse::step(messages::plate_error(), IntakeState::AwaitingPlate),
            },

            IntakeState::AwaitingProblem { plate, vehicle_id } => {
                let problem = text.trim();
                if problem.is_empty() {
                    FlowResponse::step(
                        messages::description_required(),
                        IntakeState::AwaitingProblem { plate, vehicle_id },
                    )
                } else {
                    let known = self.lookup(vehicle_id).await?;
                    let reply =
                        messages::summary(&plate, known.as_ref(), problem, photos.len());
                    FlowResponse::step(
                        reply,
                        IntakeState::Confirmation {
                            plate,
                            vehicle_id,
                            problem: problem.to_string(),
                            photos: photos.to_vec(),
                        },
                    )
                }
            }

            IntakeState::Confirmation {
                plate,
                vehicle_id,
                problem,
                photos: captured,
            } => {
                if parse::is_affirmative(text) {
                    if problem.trim().is_empty() {
                        // Should be unreachable; recover by restarting.
                        tracing::error!("Confirmation reached without a problem description");
                        FlowResponse::step(messages::internal_error_restart(), IntakeState::Initial)
                    } else {
                        info!("Intake completed for {} (plate {})", phone, plate);
                        return Ok(FlowResponse {
                            reply: messages::creating_request(),
                            state: IntakeState::Completed,
                            completed: Some(CompletedIntake {
                                conversation_id: conv.id,
                                plate,
                                vehicle_id,
                                problem,
                                photos: captured,
                            }),
                        });
                    }
                } else if parse::is_negative(text) {
                    FlowResponse::step(messages::cancelled(), IntakeState::Initial)
                } else {
                    FlowResponse::step(
                        messages::confirm_or_cancel(),
                        IntakeState::Confirmation {
                            plate,
                            vehicle_id,
                            problem,
                            photos: captured,
                        },
                    )
                }
            }

            IntakeState::Completed => {
                FlowResponse::step(messages::start_new_intake(), IntakeState::Initial)
            }
        };

        conversation::save_progress(self.db.pool(), conv.id, &response.state, now).await?;

        Ok(response)
    }

    async fn lookup(&self, vehicle_id: Option<i64>) -> Result<Option<Vehicle>, FlowError> {
        match vehicle_id {
            Some(id) => Ok(Some(vehicle::get_vehicle(self.db.pool(), id).await?)),
            None => Ok(None),
        }
    }
}
