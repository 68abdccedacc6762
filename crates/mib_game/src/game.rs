//! Top-level state machine.
//!
//! `Game` walks the ordered level list: index 0 is the title screen, index 1
//! the intro, and every later index a playable level. Exactly one state is
//! alive at a time. States never reach back into `Game`; they return a
//! `Transition` from `step`, which `apply` turns into the next state.

use std::rc::Rc;

use serde_json::Value;

use mib_core::draw::DrawList;
use mib_core::input::InputState;

use crate::audio::AudioPlayer;
use crate::error::{GameError, GameResult};
use crate::intro::IntroScreen;
use crate::level::Level;
use crate::level_file::LevelCatalog;
use crate::save::{SaveGame, SaveStore};
use crate::settings::{INTRO_INDEX, LEVELS, TITLE_INDEX};
use crate::stats::PlayerStats;
use crate::title::TitleScreen;
use crate::transition::{Flow, Transition};

pub enum ActiveState {
    Title(TitleScreen),
    Intro(IntroScreen),
    Level(Level),
}

impl ActiveState {
    pub fn label(&self) -> &'static str {
        match self {
            ActiveState::Title(_) => "Title",
            ActiveState::Intro(_) => "Intro",
            ActiveState::Level(_) => "Level",
        }
    }
}

pub struct Game {
    level_index: usize,
    player_data: PlayerStats,
    audio: Rc<AudioPlayer>,
    catalog: LevelCatalog,
    saves: SaveStore,
    active: ActiveState,
}

impl Game {
    pub fn new(
        start_level: Option<usize>,
        audio: Rc<AudioPlayer>,
        catalog: LevelCatalog,
        saves: SaveStore,
    ) -> GameResult<Self> {
        let level_index = start_level.unwrap_or(TITLE_INDEX);
        let player_data = PlayerStats::initial();
        let active = build_state(level_index, &audio, &catalog, &saves, &player_data)?;
        log::info!("Starting at level {level_index} ({})", LEVELS[level_index]);
        Ok(Self {
            level_index,
            player_data,
            audio,
            catalog,
            saves,
            active,
        })
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level_name(&self) -> &'static str {
        LEVELS[self.level_index]
    }

    pub fn level_count(&self) -> usize {
        LEVELS.len()
    }

    pub fn player_data(&self) -> &PlayerStats {
        &self.player_data
    }

    pub fn active(&self) -> &ActiveState {
        &self.active
    }

    pub fn audio(&self) -> &AudioPlayer {
        &self.audio
    }

    /// Kick off background music. Called once before the first frame.
    pub fn start(&self) -> GameResult<()> {
        self.audio.play_song(0)?;
        Ok(())
    }

    /// Move to the next entry of the level list. Returns `Flow::Exit` without
    /// touching the current state when the list is exhausted.
    pub fn advance_to_next_level(
        &mut self,
        updated_player_data: Option<PlayerStats>,
    ) -> GameResult<Flow> {
        let next = self.level_index + 1;
        if next >= LEVELS.len() {
            log::info!("Finished the last level, exiting");
            return Ok(Flow::Exit);
        }
        let player_data = updated_player_data.unwrap_or_else(|| self.player_data.clone());
        self.enter(next, player_data)?;
        Ok(Flow::Continue)
    }

    /// Rebuild the current state with the current player data.
    pub fn restart_level(&mut self) -> GameResult<()> {
        self.rebuild()
    }

    pub fn resume_game(&mut self, saved_data: &Value) -> GameResult<()> {
        let save = SaveGame::from_value(saved_data)?;
        let index = save.resume_index();
        if index >= LEVELS.len() {
            return Err(GameError::LevelOutOfRange {
                index,
                len: LEVELS.len(),
            });
        }
        log::info!("Resuming at level {index} ({})", LEVELS[index]);
        self.enter(index, save.player_data)
    }

    pub fn return_to_title_page(&mut self) -> GameResult<()> {
        self.enter(TITLE_INDEX, self.player_data.clone())
    }

    /// Persist progress up to the level before the current one, so a resumed
    /// game replays the current level from its start.
    pub fn save_game(&self) -> GameResult<()> {
        self.saves.write(&SaveGame {
            player_data: self.player_data.clone(),
            level_number: self.level_index.saturating_sub(1),
        })
    }

    pub fn apply(&mut self, transition: Transition) -> GameResult<Flow> {
        log::info!(
            "Transition '{}' from level {} ({})",
            transition.label(),
            self.level_index,
            self.level_name()
        );
        match transition {
            Transition::Advance {
                updated_player_data,
            } => return self.advance_to_next_level(updated_player_data),
            Transition::Restart => self.restart_level()?,
            Transition::Resume(saved) => self.resume_game(&saved)?,
            Transition::ReturnToTitle => self.return_to_title_page()?,
            Transition::SaveAndReturnToTitle => {
                self.save_game()?;
                self.return_to_title_page()?;
            }
        }
        Ok(Flow::Continue)
    }

    pub fn step(&mut self, input: &InputState, dt: f32) -> GameResult<Flow> {
        let transition = match &mut self.active {
            ActiveState::Title(title) => title.step(input, dt),
            ActiveState::Intro(intro) => intro.step(dt),
            ActiveState::Level(level) => level.step(input, dt),
        };
        match transition {
            Some(transition) => self.apply(transition),
            None => Ok(Flow::Continue),
        }
    }

    pub fn draw(&self, list: &mut DrawList) {
        match &self.active {
            ActiveState::Title(title) => title.draw(list),
            ActiveState::Intro(intro) => intro.draw(list),
            ActiveState::Level(level) => level.draw(list),
        }
    }

    /// Switch to `index`; nothing changes unless the new state builds.
    fn enter(&mut self, index: usize, player_data: PlayerStats) -> GameResult<()> {
        self.active = build_state(
            index,
            &self.audio,
            &self.catalog,
            &self.saves,
            &player_data,
        )?;
        self.level_index = index;
        self.player_data = player_data;
        Ok(())
    }

    fn rebuild(&mut self) -> GameResult<()> {
        self.active = build_state(
            self.level_index,
            &self.audio,
            &self.catalog,
            &self.saves,
            &self.player_data,
        )?;
        Ok(())
    }
}

fn build_state(
    index: usize,
    audio: &Rc<AudioPlayer>,
    catalog: &LevelCatalog,
    saves: &SaveStore,
    player_data: &PlayerStats,
) -> GameResult<ActiveState> {
    match index {
        TITLE_INDEX => {
            // A corrupt save disables Continue instead of blocking the menu.
            let saved = saves.load_raw().unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable save: {err}");
                None
            });
            Ok(ActiveState::Title(TitleScreen::new(Rc::clone(audio), saved)))
        }
        INTRO_INDEX => Ok(ActiveState::Intro(IntroScreen::new())),
        _ => {
            let id = LEVELS.get(index).ok_or(GameError::LevelOutOfRange {
                index,
                len: LEVELS.len(),
            })?;
            let file = catalog.get(id)?;
            Ok(ActiveState::Level(Level::new(
                file,
                Rc::clone(audio),
                player_data.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_file::sample_level;
    use mib_core::input::Key;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_save_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!(
                "mib_game_test_{}_{}_{}",
                name_hint,
                std::process::id(),
                nanos
            ))
            .join("savegame.json")
    }

    fn game_at(start: Option<usize>, name_hint: &str) -> Game {
        let catalog = LevelCatalog::from_files(["1", "2", "3"].map(sample_level));
        Game::new(
            start,
            Rc::new(AudioPlayer::disabled()),
            catalog,
            SaveStore::new(temp_save_path(name_hint)),
        )
        .expect("game should build")
    }

    fn cleanup(game: &Game) {
        if let Some(dir) = game.saves.path().parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    fn level_id(game: &Game) -> Option<&str> {
        match game.active() {
            ActiveState::Level(level) => Some(level.level_id()),
            _ => None,
        }
    }

    fn custom_stats() -> PlayerStats {
        PlayerStats {
            health: 2,
            max_health: 3,
            coins: 11,
            messages: vec!["b1".to_string()],
        }
    }

    #[test]
    fn new_builds_matching_state_for_every_index() {
        for index in 0..LEVELS.len() {
            let game = game_at(Some(index), "new");
            assert_eq!(game.level_index(), index);
            match index {
                0 => assert!(matches!(game.active(), ActiveState::Title(_))),
                1 => assert!(matches!(game.active(), ActiveState::Intro(_))),
                _ => assert_eq!(level_id(&game), Some(LEVELS[index])),
            }
        }
        assert_eq!(game_at(None, "default").level_index(), TITLE_INDEX);
    }

    #[test]
    fn new_rejects_out_of_range_index() {
        let result = Game::new(
            Some(LEVELS.len()),
            Rc::new(AudioPlayer::disabled()),
            LevelCatalog::default(),
            SaveStore::new(temp_save_path("out_of_range")),
        );
        assert!(matches!(
            result,
            Err(GameError::LevelOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn missing_level_file_is_an_error() {
        let result = Game::new(
            Some(2),
            Rc::new(AudioPlayer::disabled()),
            LevelCatalog::default(),
            SaveStore::new(temp_save_path("missing_level")),
        );
        assert!(matches!(result, Err(GameError::UnknownLevel(id)) if id == "1"));
    }

    #[test]
    fn advancing_past_last_level_exits_without_rebuilding() {
        let mut game = game_at(Some(LEVELS.len() - 1), "past_end");
        let flow = game
            .advance_to_next_level(Some(custom_stats()))
            .expect("advance");
        assert_eq!(flow, Flow::Exit);
        assert_eq!(game.level_index(), LEVELS.len() - 1);
        assert_eq!(level_id(&game), Some("3"));
        assert_eq!(game.player_data(), &PlayerStats::initial());
    }

    #[test]
    fn failed_advance_leaves_game_untouched() {
        let mut game = Game::new(
            Some(2),
            Rc::new(AudioPlayer::disabled()),
            LevelCatalog::from_files([sample_level("1")]),
            SaveStore::new(temp_save_path("failed_advance")),
        )
        .expect("level 1 builds");
        let err = game
            .advance_to_next_level(Some(custom_stats()))
            .expect_err("level 2 is missing");
        assert!(matches!(err, GameError::UnknownLevel(id) if id == "2"));
        assert_eq!(game.level_index(), 2);
        assert_eq!(level_id(&game), Some("1"));
        assert_eq!(game.player_data(), &PlayerStats::initial());
    }

    #[test]
    fn advance_with_none_keeps_player_data() {
        let mut game = game_at(Some(INTRO_INDEX), "keep_stats");
        game.advance_to_next_level(Some(custom_stats())).expect("advance");
        assert_eq!(level_id(&game), Some("1"));
        assert_eq!(game.player_data(), &custom_stats());

        game.advance_to_next_level(None).expect("advance");
        assert_eq!(level_id(&game), Some("2"));
        assert_eq!(game.player_data(), &custom_stats());
        match game.active() {
            ActiveState::Level(level) => assert_eq!(level.stats(), &custom_stats()),
            _ => panic!("expected a level"),
        }
    }

    #[test]
    fn title_advances_into_intro() {
        let mut game = game_at(None, "title_intro");
        game.advance_to_next_level(None).expect("advance");
        assert_eq!(game.level_index(), INTRO_INDEX);
        assert!(matches!(game.active(), ActiveState::Intro(_)));
    }

    #[test]
    fn restart_rebuilds_same_level_with_same_data() {
        let mut game = game_at(Some(3), "restart");
        game.restart_level().expect("restart");
        assert_eq!(game.level_index(), 3);
        assert_eq!(level_id(&game), Some("2"));
        assert_eq!(game.player_data(), &PlayerStats::initial());
    }

    #[test]
    fn resume_restores_index_and_stats() {
        let mut game = game_at(None, "resume");
        game.resume_game(&json!({
            "player_data": custom_stats(),
            "level_number": "2"
        }))
        .expect("resume");
        assert_eq!(game.level_index(), 3);
        assert_eq!(level_id(&game), Some("2"));
        assert_eq!(game.player_data(), &custom_stats());
    }

    #[test]
    fn resume_rejects_bad_blobs_and_keeps_state() {
        let mut game = game_at(None, "resume_bad");
        let err = game
            .resume_game(&json!({ "level_number": 2 }))
            .expect_err("missing player data");
        assert!(matches!(err, GameError::SaveData(_)));

        let err = game
            .resume_game(&json!({ "player_data": custom_stats(), "level_number": 9 }))
            .expect_err("index past the list");
        assert!(matches!(err, GameError::LevelOutOfRange { index: 10, .. }));
        assert_eq!(game.level_index(), TITLE_INDEX);
        assert_eq!(game.player_data(), &PlayerStats::initial());
    }

    #[test]
    fn return_to_title_always_resets_index() {
        for start in 0..LEVELS.len() {
            let mut game = game_at(Some(start), "to_title");
            game.return_to_title_page().expect("title");
            assert_eq!(game.level_index(), TITLE_INDEX);
            assert!(matches!(game.active(), ActiveState::Title(_)));
        }
    }

    #[test]
    fn save_then_resume_round_trips() {
        let mut game = game_at(Some(INTRO_INDEX), "save_resume");
        game.advance_to_next_level(Some(custom_stats())).expect("to level 1");
        game.advance_to_next_level(None).expect("to level 2");

        let flow = game
            .apply(Transition::SaveAndReturnToTitle)
            .expect("save and quit");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(game.level_index(), TITLE_INDEX);
        match game.active() {
            ActiveState::Title(title) => assert!(title.can_continue()),
            _ => panic!("expected the title screen"),
        }

        let raw = game.saves.load_raw().expect("load").expect("save exists");
        assert_eq!(raw["level_number"], json!(2));
        game.apply(Transition::Resume(raw)).expect("resume");
        assert_eq!(game.level_index(), 3);
        assert_eq!(level_id(&game), Some("2"));
        assert_eq!(game.player_data(), &custom_stats());

        cleanup(&game);
    }

    #[test]
    fn corrupt_save_only_disables_continue() {
        let mut game = game_at(None, "corrupt");
        let path = game.saves.path().to_path_buf();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("create temp dir");
        }
        fs::write(&path, "{ nope").expect("write corrupt save");

        game.return_to_title_page().expect("title still builds");
        match game.active() {
            ActiveState::Title(title) => assert!(!title.can_continue()),
            _ => panic!("expected the title screen"),
        }
        cleanup(&game);
    }

    #[test]
    fn step_drives_title_through_intro_into_level() {
        let mut game = game_at(None, "step_flow");
        let mut input = InputState::new();
        input.key_down(Key::Enter);
        assert_eq!(game.step(&input, 1.0 / 60.0).expect("step"), Flow::Continue);
        assert!(matches!(game.active(), ActiveState::Intro(_)));

        let idle = InputState::new();
        let mut steps = 0;
        while matches!(game.active(), ActiveState::Intro(_)) {
            game.step(&idle, 0.5).expect("step");
            steps += 1;
            assert!(steps < 100, "intro never finished");
        }
        assert_eq!(level_id(&game), Some("1"));
        assert_eq!(game.player_data(), &PlayerStats::initial());
    }

    #[test]
    fn goal_on_final_level_exits() {
        let mut game = game_at(Some(LEVELS.len() - 1), "final_goal");
        let flow = game
            .apply(Transition::advance_with(custom_stats()))
            .expect("apply");
        assert_eq!(flow, Flow::Exit);
    }

    #[test]
    fn start_with_music_disabled_is_a_no_op() {
        let game = game_at(None, "start");
        game.start().expect("disabled audio never fails");
        assert_eq!(game.audio().current_song(), None);
    }
}
