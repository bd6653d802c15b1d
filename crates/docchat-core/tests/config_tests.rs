use docchat_core::config::{ChunkStrategy, Config};
use figment::Jail;

#[test]
fn toml_and_env_layers_override_defaults() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file(
            "config.toml",
            r#"
            [chunking]
            chunk_size = 200
            chunk_overlap = 20
            strategy = "sentences"

            [data]
            index_stem = "out/kb"
            "#,
        )?;
        jail.set_env("APP_RETRIEVAL__TOP_K", "7");
        jail.set_env("NVIDIA_API_KEY", "secret");
        jail.set_env("NVIDIA_API_URL", "http://localhost:9/v1/chat/completions");

        let settings = Config::load().map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.chunking.chunk_size, 200);
        assert_eq!(settings.chunking.chunk_overlap, 20);
        assert_eq!(settings.chunking.strategy, ChunkStrategy::Sentences);
        assert_eq!(settings.retrieval.top_k, 7);
        assert!(settings.retrieval.show_sources, "untouched keys keep defaults");
        assert_eq!(settings.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.llm.api_url.as_deref(), Some("http://localhost:9/v1/chat/completions"));
        assert_eq!(settings.llm.model, "openai/gpt-oss-20b");
        assert_eq!(settings.data.index_stem, "out/kb");
        Ok(())
    });
}

#[test]
fn invalid_chunking_is_reported() {
    Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("config.toml", "[chunking]\nchunk_size = 10\nchunk_overlap = 10\n")?;
        let config = Config::load().map_err(|e| e.to_string())?;
        assert!(config.settings().is_err());
        let size: usize = config.get("chunking.chunk_size").map_err(|e| e.to_string())?;
        assert_eq!(size, 10);
        Ok(())
    });
}
