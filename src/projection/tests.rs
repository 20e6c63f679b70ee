use super::*;
use crate::model::group::TabGroupModel;
use crate::model::metadata::{GroupVisuals, MetadataStore};
use crate::model::tab::{LaunchOrigin, RootId, Tab, TabId};

fn tab(id: u32) -> Tab {
    Tab::new(TabId(id), format!("tab {id}"), format!("https://example.com/{id}"))
}

fn setup(ids: &[u32]) -> (TabGroupModel, MetadataStore, ProjectionEngine) {
    setup_with(ids, ProjectionConfig::default())
}

fn setup_with(ids: &[u32], config: ProjectionConfig) -> (TabGroupModel, MetadataStore, ProjectionEngine) {
    let mut model = TabGroupModel::new();
    for (i, id) in ids.iter().enumerate() {
        model.insert_tab(tab(*id), i, LaunchOrigin::Foreground, false);
    }
    let meta = MetadataStore::new();
    let mut engine = ProjectionEngine::new(config);
    engine.reset_all(&model, &meta);
    engine.take_effects();
    (model, meta, engine)
}

fn keys(engine: &ProjectionEngine) -> Vec<u32> {
    engine.items().iter().map(|item| item.key.0).collect()
}

fn cloned(model: &TabGroupModel, id: u32) -> Tab {
    model.tab(TabId(id)).cloned().unwrap()
}

mod reset {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn one_item_per_root() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3, 4]);
        model.merge(TabId(2), TabId(1), false);

        engine.reset_all(&model, &meta);
        assert_eq!(keys(&engine), vec![1, 3, 4]);
        assert_eq!(engine.item(RootId(1)).map(|i| i.count), Some(2));
    }

    #[test]
    fn second_reset_reports_unchanged() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(3), TabId(2), false);

        assert!(!engine.reset_all(&model, &meta));
        let snapshot: Vec<_> = engine.items().to_vec();
        assert!(engine.reset_all(&model, &meta));
        assert_eq!(engine.items(), snapshot.as_slice());
    }

    #[test]
    fn changed_reset_signals_one_rebuild_effect() {
        let (mut model, meta, mut engine) = setup(&[1, 2]);
        model.merge(TabId(2), TabId(1), false);

        assert!(!engine.reset_all(&model, &meta));
        assert_eq!(engine.take_effects(), vec![ViewEffect::Reset]);

        assert!(engine.reset_all(&model, &meta));
        assert!(engine.take_effects().is_empty());
    }

    #[test]
    fn unchanged_reset_keeps_transient_statuses() {
        let (model, meta, mut engine) = setup(&[1, 2]);
        engine.set_status(RootId(2), VisualStatus::ZOOM_OUT, true);

        assert!(engine.reset_all(&model, &meta));
        assert!(engine.item(RootId(2)).unwrap().status.contains(VisualStatus::ZOOM_OUT));
    }

    #[test]
    fn reset_catches_up_after_suppressed_mutations() {
        let (mut model, meta, mut engine) = setup(&[1]);
        // Mutations made while notifications were suppressed never reached
        // the engine; one reset reconciles everything.
        for id in 2..=4 {
            model.insert_tab(tab(id), id as usize, LaunchOrigin::Restored, false);
        }
        model.merge(TabId(4), TabId(3), false);

        assert!(!engine.reset_all(&model, &meta));
        assert_eq!(keys(&engine), vec![1, 2, 3]);
        assert!(engine.reset_all(&model, &meta));
    }
}

mod add_remove {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn added_tab_appears_at_translated_index() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(3), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(keys(&engine), vec![1, 2]);

        // Flat order is [1, 3, 2]; inserting at slot 2 lands between the
        // group block and tab 2, projecting to index 1.
        model.insert_tab(tab(4), 2, LaunchOrigin::Foreground, false);
        let added = cloned(&model, 4);
        engine.on_tab_added(&added, LaunchOrigin::Foreground, false, &model, &meta);

        assert_eq!(keys(&engine), vec![1, 4, 2]);
        assert_eq!(engine.take_effects(), vec![ViewEffect::Inserted { index: 1 }]);
    }

    #[test]
    fn member_added_to_projected_group_only_refreshes() {
        let (mut model, meta, mut engine) = setup(&[1, 2]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        model.insert_tab_in_group(tab(3), RootId(1), LaunchOrigin::Background, false);
        let added = cloned(&model, 3);
        engine.on_tab_added(&added, LaunchOrigin::Background, false, &model, &meta);

        assert_eq!(keys(&engine), vec![1]);
        assert_eq!(engine.item(RootId(1)).map(|i| i.count), Some(3));
        assert_eq!(engine.take_effects(), vec![ViewEffect::Updated { index: 0 }]);
    }

    #[test]
    fn restored_tab_carries_restore_status() {
        let (mut model, meta, mut engine) = setup(&[1]);
        model.insert_tab(tab(2), 1, LaunchOrigin::Restored, false);
        let added = cloned(&model, 2);
        engine.on_tab_added(&added, LaunchOrigin::Restored, false, &model, &meta);

        assert!(engine.item(RootId(2)).unwrap().status.contains(VisualStatus::RESTORE));
    }

    #[test]
    fn removing_sole_member_removes_item() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        let closed = cloned(&model, 2);
        model.close_tab(TabId(2));
        engine.on_tab_removed(&closed, &model, &meta);

        assert_eq!(keys(&engine), vec![1, 3]);
        assert!(engine.take_effects().contains(&ViewEffect::Removed { index: 1 }));
    }

    #[test]
    fn removing_group_member_keeps_item_with_surviving_representative() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        model.select(TabId(2));
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(engine.item(RootId(1)).map(|i| i.tab), Some(TabId(2)));

        let closed = cloned(&model, 2);
        model.close_tab(TabId(2));
        engine.on_tab_removed(&closed, &model, &meta);

        assert_eq!(keys(&engine), vec![1, 3]);
        assert_eq!(engine.item(RootId(1)).map(|i| i.tab), Some(TabId(1)));
        assert!(
            engine
                .take_effects()
                .contains(&ViewEffect::InvalidateThumbnail { key: RootId(1) })
        );
    }

    #[test]
    fn removing_root_member_after_rekey_keeps_item_identity() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        let closed = cloned(&model, 1);
        model.close_tab(TabId(1));
        // The mediator routes the RootChanged notification first.
        engine.rekey(RootId(1), RootId(2));
        engine.on_tab_removed(&closed, &model, &meta);

        assert_eq!(keys(&engine), vec![2, 3]);
        assert_eq!(engine.item(RootId(2)).map(|i| i.count), Some(1));
    }

    #[test]
    fn stale_removal_is_a_no_op() {
        let (model, meta, mut engine) = setup(&[1]);
        let ghost = tab(42);
        engine.on_tab_removed(&ghost, &model, &meta);
        assert_eq!(keys(&engine), vec![1]);
        assert!(engine.take_effects().is_empty());
    }
}

mod delayed {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn delayed_insertion_parks_until_commit() {
        let (mut model, meta, mut engine) = setup(&[1]);
        model.insert_tab(tab(2), 1, LaunchOrigin::Background, true);
        let added = cloned(&model, 2);
        engine.on_tab_added(&added, LaunchOrigin::Background, true, &model, &meta);

        assert_eq!(keys(&engine), vec![1]);
        assert!(engine.has_delayed());
        assert!(engine.take_effects().is_empty());

        assert_eq!(engine.commit_delayed(&model, &meta), Some(RootId(2)));
        assert_eq!(keys(&engine), vec![1, 2]);
        assert_eq!(engine.take_effects(), vec![ViewEffect::Inserted { index: 1 }]);
    }

    #[test]
    fn second_delayed_insertion_folds_the_first_in() {
        let (mut model, meta, mut engine) = setup(&[1]);
        model.insert_tab(tab(2), 1, LaunchOrigin::Background, true);
        let second = cloned(&model, 2);
        engine.on_tab_added(&second, LaunchOrigin::Background, true, &model, &meta);
        model.insert_tab(tab(3), 2, LaunchOrigin::Background, true);
        let third = cloned(&model, 3);
        engine.on_tab_added(&third, LaunchOrigin::Background, true, &model, &meta);

        // The slot holds the newest tab; the earlier one became visible.
        assert_eq!(keys(&engine), vec![1, 2]);
        assert!(engine.has_delayed());

        assert_eq!(engine.commit_delayed(&model, &meta), Some(RootId(3)));
        assert_eq!(keys(&engine), vec![1, 2, 3]);
    }

    #[test]
    fn commit_reconciles_selection_moved_while_parked() {
        let (mut model, meta, mut engine) = setup(&[1]);
        model.insert_tab(tab(2), 1, LaunchOrigin::Foreground, true);
        let added = cloned(&model, 2);
        engine.on_tab_added(&added, LaunchOrigin::Foreground, true, &model, &meta);

        model.select(TabId(2));
        let selected = cloned(&model, 2);
        engine.on_tab_selected(&selected, Some(RootId(1)), &model, &meta);
        // The old item deselects even though the new one is not visible yet.
        assert!(!engine.item(RootId(1)).unwrap().selected);

        engine.commit_delayed(&model, &meta);
        let selected: Vec<u32> =
            engine.items().iter().filter(|i| i.selected).map(|i| i.key.0).collect();
        assert_eq!(selected, vec![2]);
    }

    #[test]
    fn delayed_insertion_of_closed_tab_is_dropped() {
        let (mut model, meta, mut engine) = setup(&[1]);
        model.insert_tab(tab(2), 1, LaunchOrigin::Background, true);
        let added = cloned(&model, 2);
        engine.on_tab_added(&added, LaunchOrigin::Background, true, &model, &meta);

        let closed = cloned(&model, 2);
        model.close_tab(TabId(2));
        engine.on_tab_removed(&closed, &model, &meta);

        assert!(!engine.has_delayed());
        assert_eq!(engine.commit_delayed(&model, &meta), None);
        assert_eq!(keys(&engine), vec![1]);
    }
}

mod selection {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn selection_moves_flag_and_invalidates_both_thumbnails() {
        let (mut model, meta, mut engine) = setup(&[1, 2]);
        model.select(TabId(2));
        let selected = cloned(&model, 2);
        engine.on_tab_selected(&selected, Some(RootId(1)), &model, &meta);

        assert!(!engine.item(RootId(1)).unwrap().selected);
        assert!(engine.item(RootId(2)).unwrap().selected);
        let effects = engine.take_effects();
        assert!(effects.contains(&ViewEffect::InvalidateThumbnail { key: RootId(1) }));
        assert!(effects.contains(&ViewEffect::InvalidateThumbnail { key: RootId(2) }));
    }

    #[test]
    fn selecting_group_member_swaps_representative() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        model.select(TabId(2));
        let selected = cloned(&model, 2);
        engine.on_tab_selected(&selected, Some(RootId(1)), &model, &meta);

        let item = engine.item(RootId(1)).unwrap();
        assert_eq!(item.tab, TabId(2));
        assert!(item.selected);
        assert_eq!(item.title, "tab 2");
    }
}

mod merge_split {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn merge_collapses_source_into_destination() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(1), TabId(3), false);
        let moved = cloned(&model, 1);
        engine.on_group_merged(&moved, RootId(1), RootId(3), &model, &meta);

        assert_eq!(keys(&engine), vec![2, 3]);
        assert_eq!(engine.item(RootId(3)).map(|i| i.count), Some(2));
        let effects = engine.take_effects();
        assert!(effects.contains(&ViewEffect::Removed { index: 0 }));
        assert!(effects.contains(&ViewEffect::InvalidateThumbnail { key: RootId(3) }));
    }

    #[test]
    fn merged_label_prefers_group_metadata() {
        let (mut model, mut meta, mut engine) = setup(&[1, 2]);
        meta.set(
            RootId(2),
            GroupVisuals {
                title: Some("research".into()),
                color: None,
            },
        );
        // Metadata on a standalone item is not surfaced.
        engine.reset_all(&model, &meta);
        assert_eq!(engine.item(RootId(2)).unwrap().title, "tab 2");

        model.merge(TabId(1), TabId(2), false);
        let moved = cloned(&model, 1);
        engine.on_group_merged(&moved, RootId(1), RootId(2), &model, &meta);

        assert_eq!(engine.item(RootId(2)).unwrap().title, "research");
    }

    #[test]
    fn select_then_merge_surfaces_most_active_member() {
        let (mut model, meta, mut engine) = setup(&[2, 1]);
        model.select(TabId(1));
        let selected = cloned(&model, 1);
        engine.on_tab_selected(&selected, Some(RootId(2)), &model, &meta);

        model.merge(TabId(1), TabId(2), false);
        let moved = cloned(&model, 1);
        engine.on_group_merged(&moved, RootId(1), RootId(2), &model, &meta);

        let item = engine.item(RootId(2)).unwrap();
        assert_eq!(item.tab, TabId(1));
        assert_eq!(item.count, 2);
        assert!(item.selected);
    }

    #[test]
    fn multi_tab_merge_emits_one_update() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        // Merging group {1,2} into 3 notifies once per moved tab; only the
        // first notification changes anything observable.
        model.merge(TabId(1), TabId(3), false);
        for id in [1, 2] {
            let moved = cloned(&model, id);
            engine.on_group_merged(&moved, RootId(1), RootId(3), &model, &meta);
        }

        assert_eq!(keys(&engine), vec![3]);
        let updates = engine
            .take_effects()
            .iter()
            .filter(|e| matches!(e, ViewEffect::Updated { .. }))
            .count();
        assert_eq!(updates, 1);
    }

    #[test]
    fn split_inserts_standalone_after_former_group() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        model.merge(TabId(3), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(keys(&engine), vec![1]);

        model.split(TabId(3));
        let moved = cloned(&model, 3);
        engine.on_group_split(&moved, RootId(1), &model, &meta);

        assert_eq!(keys(&engine), vec![1, 3]);
        assert_eq!(engine.item(RootId(1)).map(|i| i.count), Some(2));
        let effects = engine.take_effects();
        assert!(effects.contains(&ViewEffect::Inserted { index: 1 }));
        assert!(effects.contains(&ViewEffect::InvalidateThumbnail { key: RootId(1) }));
    }

    #[test]
    fn split_of_root_tab_rekeys_item_first() {
        let (mut model, meta, mut engine) = setup(&[1, 2]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        model.split(TabId(1));
        engine.rekey(RootId(1), RootId(2));
        let moved = cloned(&model, 1);
        engine.on_group_split(&moved, RootId(2), &model, &meta);

        assert_eq!(keys(&engine), vec![2, 1]);
        assert_eq!(engine.item(RootId(2)).map(|i| i.count), Some(1));
        assert_eq!(engine.item(RootId(1)).map(|i| i.count), Some(1));
    }
}

mod moves {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn within_group_move_keeps_position() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();

        model.move_to(TabId(2), 0);
        let moved = cloned(&model, 2);
        engine.on_within_group_move(&moved, 1, 0, &model, &meta);

        assert_eq!(keys(&engine), vec![1, 3]);
        assert!(
            !engine.take_effects().iter().any(|e| matches!(e, ViewEffect::Moved { .. }))
        );
    }

    #[test]
    fn group_block_move_repositions_single_item() {
        let (mut model, meta, mut engine) = setup(&[1, 2, 3]);
        model.merge(TabId(2), TabId(1), false);
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(keys(&engine), vec![1, 3]);

        model.move_to(TabId(1), 2);
        let moved = cloned(&model, 1);
        engine.on_tab_moved(&moved, 0, 2, &model, &meta);

        assert_eq!(keys(&engine), vec![3, 1]);
        assert_eq!(engine.take_effects(), vec![ViewEffect::Moved { from: 0, to: 1 }]);
    }
}

mod mru {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mru() -> ProjectionConfig {
        ProjectionConfig {
            mru_mode: true,
            singleton_groups: false,
        }
    }

    #[test]
    fn reset_orders_by_recency() {
        let (mut model, meta, mut engine) = setup_with(&[1, 2, 3], mru());
        model.select(TabId(3));
        model.select(TabId(2));

        engine.reset_all(&model, &meta);
        assert_eq!(keys(&engine), vec![2, 3, 1]);
    }

    #[test]
    fn merge_repositions_destination_with_move_pair() {
        let (mut model, meta, mut engine) = setup_with(&[1, 2, 3], mru());
        model.select(TabId(3));
        model.select(TabId(2));
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(keys(&engine), vec![2, 3, 1]);

        // Merging 1 into 3 lifts group 3's recency above 2's.
        model.select(TabId(1));
        let selected = cloned(&model, 1);
        engine.on_tab_selected(&selected, Some(RootId(2)), &model, &meta);
        model.merge(TabId(1), TabId(3), false);
        let moved = cloned(&model, 1);
        engine.on_group_merged(&moved, RootId(1), RootId(3), &model, &meta);

        assert_eq!(keys(&engine), vec![3, 2]);
        assert!(
            engine
                .take_effects()
                .contains(&ViewEffect::Moved { from: 1, to: 0 })
        );
    }

    #[test]
    fn new_tab_inserts_by_recency() {
        let (mut model, meta, mut engine) = setup_with(&[1, 2], mru());
        model.select(TabId(1));
        engine.reset_all(&model, &meta);
        engine.take_effects();
        assert_eq!(keys(&engine), vec![1, 2]);

        // A fresh insertion carries the newest activity stamp.
        model.insert_tab(tab(3), 2, LaunchOrigin::Foreground, false);
        let added = cloned(&model, 3);
        engine.on_tab_added(&added, LaunchOrigin::Foreground, false, &model, &meta);

        assert_eq!(keys(&engine), vec![3, 1, 2]);
    }
}

mod statuses {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clear_transient_strips_hover_and_lift_only() {
        let (_, _, mut engine) = setup(&[1, 2]);
        engine.set_status(RootId(1), VisualStatus::HOVERED, true);
        engine.set_status(RootId(2), VisualStatus::LIFTED, true);
        engine.set_status(RootId(2), VisualStatus::ZOOM_OUT, true);
        engine.take_effects();

        engine.clear_transient_statuses();

        assert!(engine.item(RootId(1)).unwrap().status.is_empty());
        assert_eq!(engine.item(RootId(2)).unwrap().status, VisualStatus::ZOOM_OUT);
    }

    #[test]
    fn redundant_status_set_emits_nothing() {
        let (_, _, mut engine) = setup(&[1]);
        engine.set_status(RootId(1), VisualStatus::HOVERED, true);
        engine.take_effects();
        engine.set_status(RootId(1), VisualStatus::HOVERED, true);
        assert!(engine.take_effects().is_empty());
    }
}
