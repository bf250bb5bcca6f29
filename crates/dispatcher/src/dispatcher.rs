//! The dispatcher: inbound pipeline and request lifecycle.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime};
use tracing::{error, info, warn};

use database::message_history::{self, NewMessageEntry};
use database::request::{self, NewRequest, RequestEdit};
use database::work_order::{self, NewWorkOrder};
use database::{
    conversation, user, Appointment, Database, DatabaseError, MaintenanceRequest,
    MessageDirection, RequestStatus, WorkOrder,
};
use intake_flow::{CompletedIntake, IntakeFlow};
use workshop_core::{
    Classification, Classifier, InboundMessage, MessageSender, RequestEvent, SupervisorNotifier,
};

use crate::buffer::MessageBuffer;
use crate::error::DispatchError;
use crate::maintenance::{self, MaintenanceReport};

/// Tunables for the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Inbound messages without an incident report before the driver gets a
    /// nudge suggestion.
    pub nudge_threshold: i64,

    /// Inactivity window after which conversations without an active
    /// request are closed by maintenance.
    pub stale_after: Duration,

    /// How long to hold a buffered message waiting for late photo
    /// attachments before flushing it through the flow.
    pub buffer_window: StdDuration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            nudge_threshold: 3,
            stale_after: Duration::hours(24),
            buffer_window: StdDuration::from_secs(10),
        }
    }
}

/// Result of processing one inbound message.
#[derive(Debug, Clone)]
pub struct InboundOutcome {
    /// Reply sent (or to send) to the driver.
    pub reply: String,
    /// Whether this message completed an intake.
    pub flow_completed: bool,
    /// The request created from a completed intake.
    pub request: Option<MaintenanceRequest>,
    /// Suggestion to surface when the driver keeps chatting without
    /// reporting anything.
    pub nudge: Option<String>,
}

/// Result of approving a request.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub request: MaintenanceRequest,
    pub work_order: WorkOrder,
    /// Unset when auto-scheduling could not find a mechanic or slot;
    /// approval still stands and the booking is followed up manually.
    pub appointment: Option<Appointment>,
}

/// Coordinates the intake flow, scheduler and collaborators.
///
/// Generic over the chat transport, the classifier and the supervisor
/// notifier so tests can swap any of them for no-op or fixed
/// implementations.
pub struct Dispatcher<S, C, N> {
    db: Database,
    flow: IntakeFlow,
    sender: S,
    classifier: C,
    notifier: N,
    buffer: MessageBuffer,
    config: DispatcherConfig,
}

impl<S, C, N> Dispatcher<S, C, N>
where
    S: MessageSender,
    C: Classifier,
    N: SupervisorNotifier,
{
    pub fn new(db: Database, sender: S, classifier: C, notifier: N) -> Self {
        Self::with_config(db, sender, classifier, notifier, DispatcherConfig::default())
    }

    pub fn with_config(
        db: Database,
        sender: S,
        classifier: C,
        notifier: N,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            flow: IntakeFlow::new(db.clone()),
            db,
            sender,
            classifier,
            notifier,
            buffer: MessageBuffer::new(),
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Process one inbound message end-to-end.
    ///
    /// Advances the intake flow and, when the flow completes, creates the
    /// pending request, classifies it (best effort), confirms to the driver
    /// and notifies supervisors. The reply is also sent over the outbound
    /// transport; send failures are logged, never propagated.
    pub async fn process_inbound(
        &self,
        message: &InboundMessage,
        now: NaiveDateTime,
    ) -> Result<InboundOutcome, DispatchError> {
        let response = self
            .flow
            .process(&message.phone, &message.text, &message.photos, now)
            .await?;

        let outcome = match response.completed {
            Some(completed) => {
                let request = self.create_request_from_intake(&message.phone, completed, now).await?;
                let reply = registration_confirmation(&request);
                self.send_best_effort(&message.phone, &reply).await;

                InboundOutcome {
                    reply,
                    flow_completed: true,
                    request: Some(request),
                    nudge: None,
                }
            }
            None => {
                self.send_best_effort(&message.phone, &response.reply).await;

                let nudge = self.track_idle_message(&message.phone).await?;
                InboundOutcome {
                    reply: response.reply,
                    flow_completed: false,
                    request: None,
                    nudge,
                }
            }
        };

        self.log_inbound(message, outcome.flow_completed, now).await;

        Ok(outcome)
    }

    /// Buffer an inbound message and flush it through [`Self::process_inbound`]
    /// after the configured window, giving late photo attachments time to
    /// arrive. Photo-only messages join the open buffer of their number;
    /// without one they are dropped as orphans.
    pub fn enqueue_inbound(self: &Arc<Self>, message: InboundMessage)
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
        N: Send + Sync + 'static,
    {
        let dispatcher = Arc::clone(self);

        tokio::spawn(async move {
            let phone = message.phone.clone();

            if message.text.trim().is_empty() && message.has_photos() {
                if !dispatcher.buffer.append_photos(&phone, &message.photos).await {
                    warn!("Orphan photos from {} (no open buffer)", phone);
                }
                return;
            }

            dispatcher
                .buffer
                .open(&phone, &message.text, &message.photos)
                .await;
            tokio::time::sleep(dispatcher.config.buffer_window).await;

            let Some((text, photos)) = dispatcher.buffer.take(&phone).await else {
                return;
            };
            let flushed = InboundMessage::with_photos(&phone, text, photos);
            let now = chrono::Local::now().naive_local();
            if let Err(e) = dispatcher.process_inbound(&flushed, now).await {
                error!("Failed to process buffered message from {}: {}", phone, e);
            }
        });
    }

    /// Approve a pending (or previously rejected) request.
    ///
    /// Flips the request to approved, books an appointment (best effort),
    /// creates the work order, releases the conversation for new intakes and
    /// messages the driver.
    pub async fn approve(
        &self,
        request_id: i64,
        supervisor_id: i64,
        notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<ApprovalOutcome, DispatchError> {
        let req = request::get_request(self.db.pool(), request_id).await?;

        if !matches!(req.status, RequestStatus::Pending | RequestStatus::Rejected) {
            return Err(DispatchError::Validation(format!(
                "cannot approve a request in state '{:?}'",
                req.status
            )));
        }

        request::set_status(self.db.pool(), request_id, RequestStatus::Approved, notes).await?;

        // Best effort: an empty roster, a full calendar or a lost booking
        // race leaves the appointment unset, never blocks the approval.
        let appointment = match scheduler::schedule_for_request(&self.db, &req, now.date()).await {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!("Could not auto-schedule request #{}: {}", request_id, e);
                None
            }
        };

        let work_order = self
            .ensure_work_order(&req, appointment.as_ref(), supervisor_id, notes, now)
            .await?;

        if let Some(phone) = &req.phone {
            conversation::clear_active_request_by_phone(self.db.pool(), phone).await?;
        }

        let request = request::get_request(self.db.pool(), request_id).await?;

        info!(
            "Request #{} approved; work order #{} created{}",
            request_id,
            work_order.id,
            appointment
                .as_ref()
                .map(|a| format!(", appointment {} {}", a.date, a.time))
                .unwrap_or_default()
        );

        if let Some(phone) = &request.phone {
            let text = approval_message(&request, &work_order, appointment.as_ref());
            self.send_best_effort(phone, &text).await;
        }

        Ok(ApprovalOutcome {
            request,
            work_order,
            appointment,
        })
    }

    /// Reject a pending request so a supervisor can correct it.
    ///
    /// The driver is not messaged: rejection is an internal correction
    /// loop, visible again once the request is edited and re-approved.
    pub async fn reject(
        &self,
        request_id: i64,
        reason: &str,
        _now: NaiveDateTime,
    ) -> Result<MaintenanceRequest, DispatchError> {
        if reason.trim().is_empty() {
            return Err(DispatchError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }

        let req = request::get_request(self.db.pool(), request_id).await?;
        if req.status != RequestStatus::Pending {
            return Err(DispatchError::Validation(format!(
                "cannot reject a request in state '{:?}'",
                req.status
            )));
        }

        let notes = format!("[RECHAZADA - Requiere edición] {}", reason.trim());
        request::set_status(
            self.db.pool(),
            request_id,
            RequestStatus::Rejected,
            Some(&notes),
        )
        .await?;

        if let Some(phone) = &req.phone {
            conversation::clear_active_request_by_phone(self.db.pool(), phone).await?;
        }

        info!("Request #{} rejected: {}", request_id, reason.trim());

        request::get_request(self.db.pool(), request_id).await.map_err(Into::into)
    }

    /// Correct a rejected request. The state stays rejected; a fresh
    /// approval is required to progress.
    pub async fn edit_rejected(
        &self,
        request_id: i64,
        mut edit: RequestEdit,
    ) -> Result<MaintenanceRequest, DispatchError> {
        let req = request::get_request(self.db.pool(), request_id).await?;
        if req.status != RequestStatus::Rejected {
            return Err(DispatchError::Validation(
                "only rejected requests can be edited".to_string(),
            ));
        }

        if let Some(notes) = edit.supervisor_notes.take() {
            edit.supervisor_notes = Some(format!("[EDITADA MANUALMENTE] {notes}"));
        }

        request::update_fields(self.db.pool(), request_id, &edit).await?;

        info!("Request #{} edited, awaiting re-approval", request_id);

        request::get_request(self.db.pool(), request_id).await.map_err(Into::into)
    }

    /// Hard-delete a request and reset its conversation.
    ///
    /// Testing environments only: lets a driver run the intake again from a
    /// clean slate. Production flows move requests to terminal states.
    pub async fn purge_request(
        &self,
        request_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), DispatchError> {
        let req = request::get_request(self.db.pool(), request_id).await?;
        request::delete_request(self.db.pool(), request_id).await?;

        if let Some(phone) = &req.phone {
            conversation::reset(self.db.pool(), phone, now).await?;
        }

        info!("Request #{} purged and conversation reset", request_id);
        Ok(())
    }

    /// Run one background maintenance pass (see [`maintenance::run_maintenance`]).
    pub async fn run_maintenance(
        &self,
        now: NaiveDateTime,
    ) -> Result<MaintenanceReport, DispatchError> {
        maintenance::run_maintenance(&self.db, self.config.stale_after, now).await
    }

    async fn create_request_from_intake(
        &self,
        phone: &str,
        completed: CompletedIntake,
        now: NaiveDateTime,
    ) -> Result<MaintenanceRequest, DispatchError> {
        let driver = user::find_driver_by_phone(self.db.pool(), phone).await?;

        let created = request::create_request(
            self.db.pool(),
            &NewRequest::chat_intake(
                phone,
                &completed.problem,
                completed.photos.clone(),
                driver.map(|d| d.id),
                completed.vehicle_id,
            ),
            now,
        )
        .await?;

        conversation::complete_intake(self.db.pool(), completed.conversation_id, created.id, now)
            .await?;

        // Classification is best effort: a failing collaborator downgrades
        // to the fallback verdict, the request stands either way.
        let classification = match self
            .classifier
            .classify(&completed.problem, !completed.photos.is_empty())
            .await
        {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Classifier failed for request #{}: {}", created.id, e);
                Classification::fallback()
            }
        };
        if let Err(e) =
            request::apply_classification(self.db.pool(), created.id, &classification).await
        {
            warn!(
                "Could not store classification for request #{}: {}",
                created.id, e
            );
        }

        let request = request::get_request(self.db.pool(), created.id).await?;

        info!(
            "Request #{} created from intake ({}, priority {})",
            request.id, request.issue_type, request.priority
        );

        let event = RequestEvent::for_new_request(
            request.id,
            request.priority,
            request.issue_type,
            request.phone.clone(),
            request.photos.0.len(),
            &request.description,
        );
        if let Err(e) = self.notifier.publish(event).await {
            warn!("Supervisor notification failed for request #{}: {}", request.id, e);
        }

        Ok(request)
    }

    /// Create the work order for an approval, reusing one left by an
    /// earlier approval race instead of failing half-way.
    async fn ensure_work_order(
        &self,
        req: &MaintenanceRequest,
        appointment: Option<&Appointment>,
        supervisor_id: i64,
        notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<WorkOrder, DispatchError> {
        let new_order = NewWorkOrder {
            request_id: req.id,
            mechanic_id: appointment.map(|a| a.mechanic_id),
            supervisor_id: Some(supervisor_id),
            notes: Some(
                notes
                    .unwrap_or("Orden creada automáticamente al aprobar solicitud")
                    .to_string(),
            ),
        };

        match work_order::create_work_order(self.db.pool(), &new_order, now).await {
            Ok(order) => Ok(order),
            Err(DatabaseError::AlreadyExists { .. }) => {
                let existing = work_order::get_by_request(self.db.pool(), req.id).await?;
                existing.ok_or_else(|| {
                    DatabaseError::NotFound {
                        entity: "WorkOrder",
                        id: format!("request {}", req.id),
                    }
                    .into()
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn track_idle_message(&self, phone: &str) -> Result<Option<String>, DispatchError> {
        let Some(conv) = conversation::get_by_phone(self.db.pool(), phone).await? else {
            return Ok(None);
        };

        conversation::increment_idle(self.db.pool(), conv.id).await?;

        let idle = conv.idle_messages + 1;
        if idle >= self.config.nudge_threshold && conv.active_request_id.is_none() {
            return Ok(Some(nudge_message()));
        }

        Ok(None)
    }

    async fn log_inbound(&self, message: &InboundMessage, completed: bool, now: NaiveDateTime) {
        let Ok(Some(conv)) = conversation::get_by_phone(self.db.pool(), &message.phone).await
        else {
            return;
        };

        let text = if message.text.is_empty() {
            "[Imagen sin texto]".to_string()
        } else {
            message.text.clone()
        };

        if let Err(e) = message_history::record(
            self.db.pool(),
            &NewMessageEntry {
                conversation_id: conv.id,
                phone: message.phone.clone(),
                direction: MessageDirection::Inbound,
                text,
                photo_count: message.photos.len() as i64,
                completed_intake: completed,
            },
            now,
        )
        .await
        {
            warn!("Could not log message from {}: {}", message.phone, e);
        }
    }

    async fn send_best_effort(&self, phone: &str, text: &str) {
        if let Err(e) = self.sender.send(phone, text).await {
            error!("Failed to send message to {}: {}", phone, e);
        }
    }
}

fn registration_confirmation(request: &MaintenanceRequest) -> String {
    format!(
        "✅ *¡Ingreso registrado exitosamente!*\n\n\
         📋 Solicitud: #{}\n\
         📸 Evidencias: {} foto(s)\n\n\
         Tu solicitud será revisada por un supervisor y recibirás notificaciones del progreso.\n\n\
         ¡Gracias! 👍",
        request.id,
        request.photos.0.len()
    )
}

fn approval_message(
    request: &MaintenanceRequest,
    work_order: &WorkOrder,
    appointment: Option<&Appointment>,
) -> String {
    let booking = match appointment {
        Some(a) => format!(
            "\n📅 *Cita Agendada:*\n\
             Fecha: {}\n\
             Hora: {}\n\
             Duración: {} minutos\n",
            a.date.format("%d-%m-%Y"),
            a.time,
            a.duration_minutes
        ),
        None => "\n⏳ Cita por agendar (serás contactado pronto)\n".to_string(),
    };

    format!(
        "✅ *SOLICITUD APROBADA*\n\n\
         Tu solicitud #{} ha sido aprobada.\n\n\
         📋 *Detalles:*\n\
         Problema: {}\n\
         Prioridad: {}\n\n\
         🔧 Se creó la Orden de Trabajo #{}\n\
         {}\n\
         Recibirás actualizaciones del progreso.",
        request.id,
        request.issue_type,
        request.priority.as_str().to_uppercase(),
        work_order.id,
        booking
    )
}

fn nudge_message() -> String {
    "👋 Noto que has enviado varios mensajes. ¿Necesitas reportar algún problema \
     con tu vehículo? Si es así, escribe \"ingreso\" para comenzar."
        .to_string()
}
