pub mod api;
pub mod chat;
pub mod ice_extent;
pub mod route;

#[cfg(test)]
pub(crate) mod test_support {
    use std::net::SocketAddr;

    use crate::config::StateConfig;
    use crate::services::datasets::test_support::{ScratchDir, TWO_POINT_SNAPSHOT};
    use crate::services::prediction::test_support::TINY_MODEL;
    use crate::state::AppState;

    pub(crate) async fn spawn_test_server(
        state: AppState,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    /// Dataset root with two 2024 snapshots, one 2023 snapshot and the tiny
    /// prediction model. Keep the returned dir alive for the test's duration.
    pub(crate) fn fixture_state(label: &str) -> (ScratchDir, AppState) {
        let dir = ScratchDir::new(label);
        dir.write("2024/ice_20240102.geojson", TWO_POINT_SNAPSHOT);
        dir.write("2024/ice_20240103.geojson", TWO_POINT_SNAPSHOT);
        dir.write("2023/ice_20231231.geojson", TWO_POINT_SNAPSHOT);
        dir.write("trained_data/rbf_model.json", TINY_MODEL);
        let state = AppState::new(StateConfig::for_dataset_dir(dir.path()));
        (dir, state)
    }
}
