//! Chat reply templates.
//!
//! WhatsApp-style formatting: `*bold*`, emoji, short paragraphs. All texts
//! are in Spanish, matching the fleet's drivers.

use database::Vehicle;

pub fn welcome() -> String {
    "🚛 *Bienvenido al Sistema de Ingreso de Taller*\n\n\
     Para registrar el ingreso de tu vehículo, necesito los siguientes datos:\n\n\
     📋 *Paso 1:* Ingresa la *patente* del vehículo\n\
     Ejemplo: AA1234"
        .to_string()
}

pub fn help() -> String {
    "👋 ¡Hola! Soy el asistente de ingreso al taller.\n\n\
     Para iniciar el ingreso de un vehículo, envíame:\n\
     • \"Ingreso\"\n\
     • \"Hola\"\n\
     • \"Iniciar\"\n\n\
     ¿En qué puedo ayudarte?"
        .to_string()
}

pub fn vehicle_found(vehicle: &Vehicle) -> String {
    format!(
        "✅ *Vehículo encontrado:*\n\
         🚛 Patente: {}\n\
         📌 Marca: {}\n\
         📌 Modelo: {}\n\n\
         📋 *Paso 2:* Describe el *problema* o motivo del ingreso.\n\n\
         Puedes ser tan detallado como necesites y si deseas, enviar fotos 📸 junto con la descripción.",
        vehicle.plate, vehicle.brand, vehicle.model
    )
}

pub fn plate_not_registered(plate: &str) -> String {
    format!(
        "⚠️ La patente *{plate}* no está registrada en el sistema, pero continuaremos con el ingreso.\n\n\
         📋 *Paso 2:* Describe el *problema* o motivo del ingreso.\n\n\
         Puedes ser tan detallado como necesites y si deseas, enviar fotos 📸 junto con la descripción."
    )
}

pub fn plate_error() -> String {
    "❌ No pude identificar la patente.\n\n\
     Por favor envía solo la patente del vehículo.\n\
     Ejemplo: *AA1234* o *ABCD12*"
        .to_string()
}

pub fn description_required() -> String {
    "❌ Por favor describe el problema o motivo del ingreso.\n\n\
     No puedo continuar sin una descripción."
        .to_string()
}

pub fn summary(plate: &str, vehicle: Option<&Vehicle>, problem: &str, photo_count: usize) -> String {
    let vehicle_line = vehicle
        .map(|v| format!("📌 Vehículo: {} {}\n", v.brand, v.model))
        .unwrap_or_default();

    format!(
        "📋 *Resumen del Ingreso:*\n\n\
         🚛 Patente: {plate}\n\
         {vehicle_line}❗ Problema: {problem}\n\
         📸 Fotos: {photo_count}\n\n\
         ¿Confirmas esta información?\n\
         • Escribe *\"sí\"* para confirmar\n\
         • Escribe *\"no\"* para cancelar"
    )
}

pub fn confirm_or_cancel() -> String {
    "Por favor confirma:\n\
     • Escribe *\"sí\"* para crear la solicitud\n\
     • Escribe *\"no\"* para cancelar"
        .to_string()
}

pub fn cancelled() -> String {
    "❌ Ingreso cancelado.\n\n\
     Para iniciar un nuevo ingreso, escribe \"ingreso\"."
        .to_string()
}

pub fn creating_request() -> String {
    "✅ ¡Perfecto! Creando la solicitud de ingreso...".to_string()
}

pub fn start_new_intake() -> String {
    "✅ El ingreso anterior fue completado.\n\n\
     ¿Deseas hacer un nuevo ingreso?\n\
     Escribe \"ingreso\" para comenzar."
        .to_string()
}

pub fn internal_error_restart() -> String {
    "❌ Error interno: falta la descripción del problema. \
     Por favor reinicia el proceso escribiendo \"ingreso\"."
        .to_string()
}
