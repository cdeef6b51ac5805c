//! The deathmatch state machine: turn scheduling, word validation, score
//! accounting, elimination and winner detection.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::dictionary::Dictionary;
use crate::domain::{
    DeathmatchRules, GameEvent, GameId, GamePlayer, PlayerId, RoomId, Turn, Word,
};
use crate::protocol::{GameStatePayload, TurnOut};

const INFO_CORRECT: &str = "Word is correct";
const INFO_NOT_A_WORD: &str = "Word does not exist";
const INFO_ALREADY_USED: &str = "Word has already been used";
const INFO_CHAIN_MISMATCH: &str = "Word does not start with the last letter of the previous word";
const INFO_TIMED_OUT: &str = "Turn time exceeded";

/// Phases of a single game.
///
/// ```text
/// Creating -> Started -> Waiting -> StartedTurn -> EndedTurn -> Waiting ...
///                                                            -> Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Creating,
    Started,
    Waiting,
    StartedTurn,
    EndedTurn,
    Ended,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// A state-machine call out of order. Never observable externally.
    #[error("cannot {action} in the {state:?} game state")]
    IllegalState {
        action: &'static str,
        state: GameState,
    },
    #[error("no active player left to advance to")]
    NoActivePlayer,
}

/// A randomized circular player sequence tracking whose turn it is and which
/// final place is currently at stake.
#[derive(Debug)]
pub struct OrderedPlayers {
    players: Vec<GamePlayer>,
    current_idx: usize,
    current_place: u32,
}

impl OrderedPlayers {
    /// Shuffle the given players into the turn order used for the whole game.
    #[must_use]
    pub fn new(mut players: Vec<GamePlayer>) -> Self {
        use rand::seq::SliceRandom;
        players.shuffle(&mut rand::rng());
        let current_place = players.len() as u32;
        Self {
            players,
            current_idx: 0,
            current_place,
        }
    }

    #[must_use]
    pub fn current(&self) -> &GamePlayer {
        &self.players[self.current_idx]
    }

    fn current_mut(&mut self) -> &mut GamePlayer {
        &mut self.players[self.current_idx]
    }

    #[must_use]
    pub fn current_idx(&self) -> usize {
        self.current_idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, GamePlayer> {
        self.players.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[GamePlayer] {
        &self.players
    }

    /// Advance to the next player still in the game. Callers must have ruled
    /// out a finished game first; a full wrap without a hit is an error.
    pub fn next(&mut self) -> Result<(), GameError> {
        let len = self.players.len();
        for step in 1..=len {
            let idx = (self.current_idx + step) % len;
            if self.players[idx].in_game {
                self.current_idx = idx;
                return Ok(());
            }
        }
        Err(GameError::NoActivePlayer)
    }

    /// Eliminate the current player and assign the place being played for.
    fn remove_current(&mut self) {
        let place = self.current_place;
        let player = self.current_mut();
        player.in_game = false;
        player.place = Some(place);
        self.current_place = self.current_place.saturating_sub(1);
    }
}

/// One deathmatch game. Mutated only by its owning game loop; the message
/// router reads the current player through the game registry.
pub struct Deathmatch {
    id: GameId,
    room_id: RoomId,
    rules: DeathmatchRules,
    state: GameState,
    players: OrderedPlayers,
    turns: Vec<Turn>,
    current_turn: Option<Turn>,
    /// Lowercased accepted words; never shrinks.
    words: HashSet<String>,
    /// Drained by the orchestrator after each turn.
    events: Vec<GameEvent>,
    dictionary: Arc<dyn Dictionary>,
}

impl Deathmatch {
    #[must_use]
    pub fn new(
        id: GameId,
        room_id: RoomId,
        players: Vec<(PlayerId, String)>,
        rules: DeathmatchRules,
        dictionary: Arc<dyn Dictionary>,
    ) -> Self {
        let game_players = players
            .into_iter()
            .map(|(player_id, name)| GamePlayer::new(player_id, name, rules.start_score))
            .collect();
        Self {
            id,
            room_id,
            rules,
            state: GameState::Creating,
            players: OrderedPlayers::new(game_players),
            turns: Vec::new(),
            current_turn: None,
            words: HashSet::new(),
            events: Vec::new(),
            dictionary,
        }
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    #[must_use]
    pub fn rules(&self) -> &DeathmatchRules {
        &self.rules
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn players(&self) -> &OrderedPlayers {
        &self.players
    }

    #[must_use]
    pub fn current_player(&self) -> &GamePlayer {
        self.players.current()
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Accepted-word count; reported as the chain length.
    #[must_use]
    pub fn chain_length(&self) -> usize {
        self.words.len()
    }

    /// Seconds remaining in the current turn; zero once the deadline passed
    /// or when no turn is open.
    #[must_use]
    pub fn time_left_in_turn(&self) -> f64 {
        let Some(turn) = &self.current_turn else {
            return 0.0;
        };
        let elapsed = (Utc::now() - turn.started_on).num_milliseconds() as f64 / 1000.0;
        (f64::from(self.rules.round_time) - elapsed).max(0.0)
    }

    pub fn start(&mut self) -> Result<GameStatePayload, GameError> {
        if self.state != GameState::Creating {
            return Err(self.illegal("start the game"));
        }
        self.state = GameState::Started;
        Ok(GameStatePayload::Started {
            id: self.id,
            players: self.players.as_slice().to_vec(),
            rules: self.rules,
        })
    }

    pub fn wait(&mut self) -> Result<GameStatePayload, GameError> {
        if !matches!(self.state, GameState::Started | GameState::EndedTurn) {
            return Err(self.illegal("enter the waiting phase"));
        }
        self.state = GameState::Waiting;
        Ok(GameStatePayload::Waiting)
    }

    /// Open a turn for the next active player (the first turn keeps the
    /// initial player).
    pub fn start_turn(&mut self) -> Result<GameStatePayload, GameError> {
        if self.state != GameState::Waiting {
            return Err(self.illegal("start a turn"));
        }
        self.state = GameState::StartedTurn;
        self.events.clear();

        if !self.turns.is_empty() {
            self.players.next()?;
        }

        let turn = Turn::started(self.players.current().id);
        let out = TurnOut::from_turn(&turn, self.players.current_idx());
        self.current_turn = Some(turn);
        Ok(GameStatePayload::StartedTurn { current_turn: out })
    }

    /// Close the current turn with a submitted word.
    pub async fn end_turn_in_time(&mut self, word: &str) -> Result<GameStatePayload, GameError> {
        if self.state != GameState::StartedTurn {
            return Err(self.illegal("end a turn"));
        }
        self.state = GameState::EndedTurn;

        let mut turn = self
            .current_turn
            .take()
            .ok_or(GameError::IllegalState {
                action: "end a turn",
                state: GameState::EndedTurn,
            })?;
        // Stamp the end before the dictionary round-trip so lookup latency
        // does not count against the turn duration.
        turn.ended_on = Some(Utc::now());

        let (word, info) = self.validate_word(word).await;
        turn.word = Some(word);
        turn.info = Some(info.to_string());

        self.seal_turn(turn);
        Ok(self.ended_turn_payload())
    }

    /// Close the current turn with no submission.
    pub fn end_turn_timed_out(
        &mut self,
        max_deviation_secs: f64,
    ) -> Result<GameStatePayload, GameError> {
        if self.state != GameState::StartedTurn {
            return Err(self.illegal("end a turn"));
        }
        self.state = GameState::EndedTurn;

        let mut turn = self
            .current_turn
            .take()
            .ok_or(GameError::IllegalState {
                action: "end a turn",
                state: GameState::EndedTurn,
            })?;
        turn.ended_on = Some(Utc::now());
        turn.word = None;
        turn.info = Some(INFO_TIMED_OUT.to_string());

        let elapsed = (turn.ended_on.unwrap_or(turn.started_on) - turn.started_on)
            .num_milliseconds() as f64
            / 1000.0;
        if elapsed > f64::from(self.rules.round_time) + max_deviation_secs {
            tracing::warn!(
                game_id = self.id,
                elapsed,
                round_time = self.rules.round_time,
                "turn overshot its deadline beyond the tolerated deviation"
            );
        }

        self.seal_turn(turn);
        Ok(self.ended_turn_payload())
    }

    /// Finish the game, emitting the winner/finish events.
    pub fn end(&mut self) -> Result<GameStatePayload, GameError> {
        if self.state != GameState::EndedTurn {
            return Err(self.illegal("end the game"));
        }
        self.state = GameState::Ended;

        if self.players.len() > 1 {
            if let Some(winner) = self.players.iter().find(|player| player.in_game) {
                self.events.push(GameEvent::PlayerWon {
                    player_name: winner.name.clone(),
                });
            }
        }
        self.events.push(GameEvent::GameFinished {
            chain_length: self.words.len(),
        });
        Ok(GameStatePayload::Ended)
    }

    /// The game ends when at most one player remains in it: exactly one in a
    /// multiplayer game, zero in the degenerate solo game.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        if self.players.len() == 1 {
            return !self.players.current().in_game;
        }
        self.players.iter().filter(|player| player.in_game).count() == 1
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn illegal(&self, action: &'static str) -> GameError {
        GameError::IllegalState {
            action,
            state: self.state,
        }
    }

    fn ended_turn_payload(&self) -> GameStatePayload {
        let turn = self
            .turns
            .last()
            .map(|turn| TurnOut::from_turn(turn, self.players.current_idx()));
        GameStatePayload::EndedTurn {
            players: self.players.as_slice().to_vec(),
            // The turn was just sealed; it is always present here.
            current_turn: turn.unwrap_or(TurnOut {
                word: None,
                started_on: Utc::now(),
                ended_on: None,
                info: None,
                player_idx: self.players.current_idx(),
            }),
        }
    }

    /// Ordered validation; the first failure wins.
    async fn validate_word(&mut self, raw: &str) -> (Word, &'static str) {
        let word = raw.to_lowercase();

        if !self.chains_with_previous(&word) {
            return (Word::incorrect(word), INFO_CHAIN_MISMATCH);
        }

        let looked_up = match self.dictionary.lookup(&word).await {
            Ok(looked_up) => looked_up,
            Err(err) => {
                // Unavailable dictionary: the word scores as incorrect for
                // this turn.
                tracing::warn!(game_id = self.id, word = %word, error = %err, "dictionary lookup failed");
                Word::incorrect(word.clone())
            }
        };
        if !looked_up.is_correct {
            return (looked_up, INFO_NOT_A_WORD);
        }

        if self.words.contains(&word) {
            return (Word::incorrect(word), INFO_ALREADY_USED);
        }

        self.words.insert(word);
        (looked_up, INFO_CORRECT)
    }

    /// The first character must equal the last character of the most recent
    /// accepted word, if any.
    fn chains_with_previous(&self, word: &str) -> bool {
        let previous = self.turns.iter().rev().find_map(|turn| {
            turn.word
                .as_ref()
                .filter(|word| word.is_correct)
                .map(|word| word.content.as_str())
        });
        match previous {
            None => true,
            Some(previous) => match (previous.chars().last(), word.chars().next()) {
                (Some(last), Some(first)) => last == first,
                _ => false,
            },
        }
    }

    /// Apply scoring to the just-sealed turn and eliminate on a non-positive
    /// score.
    fn seal_turn(&mut self, turn: Turn) {
        let correct = turn.word.as_ref().is_some_and(|word| word.is_correct);
        if correct {
            self.players.current_mut().score += self.rules.reward;
        } else {
            let player = self.players.current_mut();
            player.mistakes += 1;
            player.score += self.rules.penalty;
        }

        if self.players.current().score <= 0 {
            self.players.remove_current();
            if self.players.len() != 1 {
                self.events.push(GameEvent::PlayerLost {
                    player_name: self.players.current().name.clone(),
                });
            }
        }

        self.turns.push(turn);
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::dictionary::WordListDictionary;

    use super::*;

    fn rules(round_time: u32, start_score: i32, penalty: i32, reward: i32) -> DeathmatchRules {
        DeathmatchRules {
            round_time,
            start_score,
            penalty,
            reward,
            ..DeathmatchRules::default()
        }
    }

    fn dictionary() -> Arc<dyn Dictionary> {
        Arc::new(WordListDictionary::new([
            "apple", "elephant", "tiger", "rabbit", "banana",
        ]))
    }

    fn two_player_game(rules: DeathmatchRules) -> Deathmatch {
        let players = vec![
            (Uuid::new_v4(), "alice".to_string()),
            (Uuid::new_v4(), "bob".to_string()),
        ];
        Deathmatch::new(1, 2, players, rules, dictionary())
    }

    fn advance_to_first_turn(game: &mut Deathmatch) {
        game.start().unwrap();
        game.wait().unwrap();
        game.start_turn().unwrap();
    }

    async fn play_word(game: &mut Deathmatch, word: &str) {
        game.end_turn_in_time(word).await.unwrap();
        if !game.is_finished() {
            game.wait().unwrap();
            game.start_turn().unwrap();
        }
    }

    fn time_out(game: &mut Deathmatch) {
        game.end_turn_timed_out(0.1).unwrap();
        if !game.is_finished() {
            game.wait().unwrap();
            game.start_turn().unwrap();
        }
    }

    #[tokio::test]
    async fn test_two_player_deathmatch_clean_finish() {
        // round_time=10, start=5, reward=2, penalty=-5
        let mut game = two_player_game(rules(10, 5, -5, 2));
        let first = game.current_player().name.clone();
        let second = game
            .players()
            .iter()
            .find(|player| player.name != first)
            .unwrap()
            .name
            .clone();

        advance_to_first_turn(&mut game);

        // Four correct words chain: apple -> elephant -> tiger -> rabbit.
        play_word(&mut game, "apple").await;
        assert!(game.take_events().is_empty());
        play_word(&mut game, "elephant").await;
        play_word(&mut game, "tiger").await;
        play_word(&mut game, "rabbit").await;

        let scores: Vec<i32> = game.players().iter().map(|player| player.score).collect();
        assert_eq!(scores, vec![9, 9]);

        // Three timeouts: first drops to 4, second drops to 4, first drops
        // to -1 and is eliminated.
        time_out(&mut game); // first player's turn
        time_out(&mut game); // second player's turn
        time_out(&mut game); // first player again -> eliminated

        assert!(game.is_finished());
        let events = game.take_events();
        assert_eq!(
            events,
            vec![GameEvent::PlayerLost {
                player_name: first.clone()
            }]
        );

        game.end().unwrap();
        let events = game.take_events();
        assert_eq!(
            events,
            vec![
                GameEvent::PlayerWon {
                    player_name: second.clone()
                },
                GameEvent::GameFinished { chain_length: 4 },
            ]
        );

        // Chain length equals the used-words set, which equals the accepted
        // turns.
        assert_eq!(game.chain_length(), 4);
        let accepted = game
            .turns()
            .iter()
            .filter(|turn| turn.word.as_ref().is_some_and(|word| word.is_correct))
            .count();
        assert_eq!(accepted, 4);
        assert_eq!(game.turns().len(), 7);

        let eliminated = game
            .players()
            .iter()
            .find(|player| player.name == first)
            .unwrap();
        assert!(!eliminated.in_game);
        assert_eq!(eliminated.place, Some(2));
        let winner = game
            .players()
            .iter()
            .find(|player| player.name == second)
            .unwrap();
        assert!(winner.in_game);
        assert_eq!(winner.place, None);
    }

    #[tokio::test]
    async fn test_duplicate_word_rejected() {
        let mut game = two_player_game(rules(10, 10, -3, 2));
        advance_to_first_turn(&mut game);

        play_word(&mut game, "apple").await;
        play_word(&mut game, "elephant").await;
        play_word(&mut game, "tiger").await;
        play_word(&mut game, "rabbit").await;
        assert_eq!(game.chain_length(), 4);

        // Duplicate: "tiger" chains off "rabbit" but was already used.
        let score = game.current_player().score;
        game.end_turn_in_time("tiger").await.unwrap();
        let turn = game.turns().last().unwrap();
        assert_eq!(turn.info.as_deref(), Some("Word has already been used"));
        assert!(!turn.word.as_ref().unwrap().is_correct);
        assert_eq!(game.current_player().score, score - 3);
        assert_eq!(game.chain_length(), 4);
    }

    /// Dictionary stub proving a code path never reaches the lookup.
    struct UnreachableDictionary;

    #[async_trait::async_trait]
    impl Dictionary for UnreachableDictionary {
        async fn lookup(
            &self,
            word: &str,
        ) -> Result<Word, crate::dictionary::DictionaryError> {
            panic!("dictionary must not be consulted for {word}");
        }
    }

    #[tokio::test]
    async fn test_chain_mismatch_rejected_without_dictionary() {
        let mut game = two_player_game(rules(10, 10, -3, 2));
        advance_to_first_turn(&mut game);
        play_word(&mut game, "apple").await;

        // "banana" does not start with 'e'; the mismatch is decided before
        // any lookup.
        game.dictionary = Arc::new(UnreachableDictionary);
        game.end_turn_in_time("banana").await.unwrap();
        let turn = game.turns().last().unwrap();
        assert_eq!(
            turn.info.as_deref(),
            Some("Word does not start with the last letter of the previous word")
        );
        assert!(!turn.word.as_ref().unwrap().is_correct);
        assert_eq!(game.chain_length(), 1);
    }

    #[tokio::test]
    async fn test_lowercasing_applies_before_comparison() {
        let mut game = two_player_game(rules(10, 10, -3, 2));
        advance_to_first_turn(&mut game);
        play_word(&mut game, "Apple").await;
        assert!(game.turns()[0].word.as_ref().unwrap().is_correct);
        assert_eq!(game.turns()[0].word.as_ref().unwrap().content, "apple");

        game.end_turn_in_time("ELEPHANT").await.unwrap();
        let turn = game.turns().last().unwrap();
        assert!(turn.word.as_ref().unwrap().is_correct);
        assert_eq!(turn.word.as_ref().unwrap().content, "elephant");
    }

    #[tokio::test]
    async fn test_solo_game_elimination_emits_only_game_finished() {
        let players = vec![(Uuid::new_v4(), "solo".to_string())];
        let mut game = Deathmatch::new(1, 2, players, rules(3, 0, -5, 2), dictionary());
        advance_to_first_turn(&mut game);

        // start_score=0: one timeout eliminates the sole player.
        game.end_turn_timed_out(0.1).unwrap();
        assert!(game.is_finished());
        assert!(game.take_events().is_empty());

        game.end().unwrap();
        let events = game.take_events();
        assert_eq!(events, vec![GameEvent::GameFinished { chain_length: 0 }]);

        let player = game.players().current();
        assert!(!player.in_game);
        assert_eq!(player.place, Some(1));
    }

    #[tokio::test]
    async fn test_illegal_transitions_are_rejected() {
        let mut game = two_player_game(rules(10, 5, -5, 2));
        assert!(matches!(
            game.start_turn(),
            Err(GameError::IllegalState { .. })
        ));
        game.start().unwrap();
        assert!(matches!(game.start(), Err(GameError::IllegalState { .. })));
        game.wait().unwrap();
        assert!(matches!(
            game.end_turn_timed_out(0.1),
            Err(GameError::IllegalState { .. })
        ));
        game.start_turn().unwrap();
        assert!(matches!(game.end(), Err(GameError::IllegalState { .. })));
    }

    #[tokio::test]
    async fn test_turn_advances_skip_eliminated_players() {
        let players = vec![
            (Uuid::new_v4(), "a".to_string()),
            (Uuid::new_v4(), "b".to_string()),
            (Uuid::new_v4(), "c".to_string()),
        ];
        // Everyone at score 3, penalty -5: any mistake eliminates.
        let mut game = Deathmatch::new(1, 2, players, rules(10, 3, -5, 2), dictionary());
        advance_to_first_turn(&mut game);

        let first = game.current_player().name.clone();
        time_out(&mut game);
        assert!(!game.is_finished());
        // The eliminated player is skipped from now on.
        assert_ne!(game.current_player().name, first);

        let second = game.current_player().name.clone();
        time_out(&mut game);
        assert!(game.is_finished());
        let events = game.take_events();
        assert_eq!(
            events,
            vec![GameEvent::PlayerLost {
                player_name: second
            }]
        );

        game.end().unwrap();
        // Places form a contiguous descending range ending above 1.
        let mut places: Vec<u32> = game
            .players()
            .iter()
            .filter_map(|player| player.place)
            .collect();
        places.sort_unstable();
        assert_eq!(places, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_time_left_in_turn_counts_down_from_round_time() {
        let mut game = two_player_game(rules(10, 5, -5, 2));
        assert!(game.time_left_in_turn() <= f64::EPSILON);
        advance_to_first_turn(&mut game);
        let left = game.time_left_in_turn();
        assert!(left > 9.0 && left <= 10.0);
    }
}
