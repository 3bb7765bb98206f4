pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

#[cfg(feature = "desktop")]
use commands::{
    bugs::{delete_bug, edit_bug, get_dashboard, list_bugs, report_bug},
    settings::{get_settings, save_settings},
    webhook::{disconnect_webhook, get_webhook_status, save_webhook_config, test_webhook_connection},
};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            report_bug,
            edit_bug,
            delete_bug,
            list_bugs,
            get_dashboard,
            get_webhook_status,
            save_webhook_config,
            disconnect_webhook,
            test_webhook_connection,
            get_settings,
            save_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
