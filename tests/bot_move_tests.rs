// End-to-end tests for the move endpoint logic
//
// Requests are built as Battlesnake JSON, fed through Bot::get_move and the
// chosen move read back from the response, exactly as the HTTP layer sees it.
// Uniform scores make the policy prefer "up" (lowest index wins the tie).

use pretrained_snake::bot::Bot;
use pretrained_snake::config::Config;
use pretrained_snake::error::{DecisionError, OracleError};
use pretrained_snake::oracle::{LinearModelFile, OracleSet, UniformPolicy};
use pretrained_snake::types::GameState;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

fn uniform_bot(board_size: u32) -> Bot {
    let oracles = OracleSet::new().with_oracle(board_size, Arc::new(UniformPolicy));
    Bot::new(Config::default_hardcoded(), oracles)
}

fn coords(points: &[(i32, i32)]) -> Value {
    Value::Array(points.iter().map(|(x, y)| json!({ "x": x, "y": y })).collect())
}

fn snake(id: &str, health: i32, body: &[(i32, i32)]) -> Value {
    json!({
        "id": id,
        "name": id,
        "health": health,
        "body": coords(body),
        "head": { "x": body[0].0, "y": body[0].1 },
        "length": body.len(),
        "latency": "0",
        "shout": null,
    })
}

fn request(
    game_id: &str,
    turn: i32,
    size: u32,
    you: Value,
    others: Vec<Value>,
    food: &[(i32, i32)],
) -> GameState {
    let mut snakes = vec![you.clone()];
    snakes.extend(others);
    serde_json::from_value(json!({
        "game": { "id": game_id, "ruleset": {}, "timeout": 500 },
        "turn": turn,
        "board": {
            "height": size,
            "width": size,
            "food": coords(food),
            "snakes": snakes,
            "hazards": [],
        },
        "you": you,
    }))
    .expect("fixture should deserialize")
}

fn chosen(response: &Value) -> &str {
    response["move"].as_str().expect("response has a move")
}

fn temp_model_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pretrained-snake-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn test_open_board_follows_policy() {
    let bot = uniform_bot(11);
    let you = snake("me", 90, &[(5, 5), (5, 4), (5, 3)]);
    let response = bot.get_move(request("g1", 3, 11, you, vec![], &[])).await.unwrap();
    assert_eq!(chosen(&response), "up");
}

#[tokio::test]
async fn test_top_wall_avoids_leaving_board() {
    let bot = uniform_bot(11);
    // Head on the top row: "up" runs into the border, "down" into the neck
    let you = snake("me", 90, &[(5, 10), (5, 9), (5, 8)]);
    let response = bot.get_move(request("g2", 7, 11, you, vec![], &[])).await.unwrap();
    let mv = chosen(&response);
    assert!(mv == "left" || mv == "right", "unexpected move {}", mv);
}

#[tokio::test]
async fn test_trapped_snake_follows_policy() {
    let bot = uniform_bot(11);
    // Top wall above, own neck below, opponents on both sides
    let you = snake("me", 90, &[(5, 10), (5, 9), (5, 8)]);
    let left = snake("left", 90, &[(4, 10), (4, 9), (4, 8)]);
    let right = snake("right", 90, &[(6, 10), (6, 9), (6, 8)]);
    let response = bot
        .get_move(request("g3", 20, 11, you, vec![left, right], &[]))
        .await
        .unwrap();
    assert_eq!(chosen(&response), "up");
}

#[tokio::test]
async fn test_dead_opponents_do_not_block() {
    let bot = uniform_bot(11);
    let you = snake("me", 90, &[(5, 5), (5, 4)]);
    let ghost = snake("ghost", 0, &[(5, 6), (5, 7)]);
    let response = bot
        .get_move(request("g4", 9, 11, you, vec![ghost], &[]))
        .await
        .unwrap();
    assert_eq!(chosen(&response), "up");
}

#[tokio::test]
async fn test_hungry_snake_eats_adjacent_food() {
    let bot = uniform_bot(11);
    let you = snake("me", 20, &[(5, 5), (5, 4), (5, 3)]);
    let response = bot
        .get_move(request("g5", 40, 11, you, vec![], &[(6, 5), (0, 0)]))
        .await
        .unwrap();
    assert_eq!(chosen(&response), "right");
}

#[tokio::test]
async fn test_healthy_snake_ignores_adjacent_food() {
    let bot = uniform_bot(11);
    let you = snake("me", 80, &[(5, 5), (5, 4), (5, 3)]);
    let response = bot
        .get_move(request("g6", 40, 11, you, vec![], &[(6, 5)]))
        .await
        .unwrap();
    assert_eq!(chosen(&response), "up");
}

#[tokio::test]
async fn test_unsupported_board_size_is_error() {
    let bot = uniform_bot(11);
    let you = snake("me", 90, &[(3, 3), (3, 2)]);
    let result = bot.get_move(request("g7", 1, 9, you, vec![], &[])).await;
    assert!(matches!(result, Err(DecisionError::UnsupportedBoardSize(9))));
}

#[tokio::test]
async fn test_off_board_body_is_error() {
    let bot = uniform_bot(11);
    let you = snake("me", 90, &[(11, 3), (10, 3)]);
    let result = bot.get_move(request("g8", 1, 11, you, vec![], &[])).await;
    assert!(matches!(result, Err(DecisionError::Grid(_))));
}

#[tokio::test]
async fn test_end_forgets_previous_grid() {
    let bot = uniform_bot(11);
    let you = snake("me", 90, &[(5, 5), (5, 4)]);
    let state = request("g9", 0, 11, you, vec![], &[]);
    bot.get_move(state.clone()).await.unwrap();
    assert_eq!(bot.extractor().tracked_snakes(), 1);

    bot.end(&state.game, &state.turn, &state.board, &state.you);
    assert_eq!(bot.extractor().tracked_snakes(), 0);
}

#[tokio::test]
async fn test_loaded_linear_model_drives_moves() {
    let dir = temp_model_dir("linear");
    // 7x7 board + 1 border on each side, 4 channels, two layers, 6 scalars
    let input_len = 9 * 9 * 4 * 2 + 6;
    let model = LinearModelFile {
        board_size: 7,
        weights: vec![vec![0.0; input_len]; 4],
        bias: vec![0.0, 0.0, 0.0, 2.0],
    };
    fs::write(
        OracleSet::model_path(&dir, 7),
        serde_json::to_string(&model).unwrap(),
    )
    .unwrap();

    let mut config = Config::default_hardcoded();
    config.oracle.model_dir = dir.to_string_lossy().into_owned();
    config.oracle.supported_board_sizes = vec![7];
    let oracles = OracleSet::load(&config.oracle).unwrap();
    let bot = Bot::new(config, oracles);

    let you = snake("me", 90, &[(3, 3), (2, 3)]);
    let first = bot.get_move(request("g10", 0, 7, you, vec![], &[])).await.unwrap();
    assert_eq!(chosen(&first), "right");

    let you = snake("me", 89, &[(4, 3), (3, 3)]);
    let second = bot.get_move(request("g10", 1, 7, you, vec![], &[])).await.unwrap();
    assert_eq!(chosen(&second), "right");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_model_file_fails_load() {
    let dir = temp_model_dir("missing");
    let mut config = Config::default_hardcoded();
    config.oracle.model_dir = dir.to_string_lossy().into_owned();
    config.oracle.supported_board_sizes = vec![19];

    let result = OracleSet::load(&config.oracle);
    assert!(matches!(result, Err(OracleError::Io { .. })));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_model_with_wrong_board_size_fails_load() {
    let dir = temp_model_dir("mislabelled");
    let model = LinearModelFile {
        board_size: 11,
        weights: vec![vec![0.0; 10]; 4],
        bias: vec![0.0; 4],
    };
    fs::write(
        OracleSet::model_path(&dir, 7),
        serde_json::to_string(&model).unwrap(),
    )
    .unwrap();

    let mut config = Config::default_hardcoded();
    config.oracle.model_dir = dir.to_string_lossy().into_owned();
    config.oracle.supported_board_sizes = vec![7];

    let result = OracleSet::load(&config.oracle);
    assert!(matches!(result, Err(OracleError::MalformedModel(_))));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_info_reports_configured_appearance() {
    let bot = uniform_bot(11);
    let info = bot.info();
    assert_eq!(info["apiversion"], "1");
    assert_eq!(info["color"], "#00FF00");
}
