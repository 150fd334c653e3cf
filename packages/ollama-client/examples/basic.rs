//! Basic Ollama client usage example

use ollama_client::{GenerateRequest, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Uses OLLAMA_HOST or http://localhost:11434
    let client = OllamaClient::from_env();

    println!("=== Models ===");
    for model in client.list_models().await? {
        println!("{} ({} bytes)", model.name, model.size);
    }

    println!("\n=== Generate ===");
    let response = client
        .generate(
            GenerateRequest::new("llama3.1", "What is Rust in one sentence?")
                .system("You are a helpful assistant.")
                .temperature(0.7)
                .num_predict(100),
        )
        .await?;

    println!("Response: {}", response.response);

    println!("\n=== JSON mode ===");
    let response = client
        .generate(
            GenerateRequest::new(
                "llama3.1",
                "Return {\"language\": <name>} for the language with the borrow checker.",
            )
            .json(),
        )
        .await?;

    println!("Response: {}", response.response);

    Ok(())
}
