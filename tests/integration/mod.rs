mod cli_dispatch;
mod embed_pipeline;
mod rewrite_round_trip;
