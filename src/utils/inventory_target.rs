//! 库存目标组织选择
//!
//! 扣减时: 活动所属组织库存充足则优先；否则取可用库存最多的组织；
//!         若所有记录都无可用库存，退而取任意一条已有记录。
//! 退回时: 活动所属组织只要有库存记录即优先；否则同上。

use uuid::Uuid;

use crate::entities::inventory_entity as inventory;

pub fn select_target_inventory<'a>(
    rows: &'a [inventory::Model],
    owner_organization_id: Uuid,
    delta: i64,
) -> Option<&'a inventory::Model> {
    let owner = rows
        .iter()
        .find(|r| r.organization_id == owner_organization_id);

    let owner_fits = match owner {
        Some(row) if delta > 0 => row.quantity_available >= delta,
        Some(_) => true,
        None => false,
    };
    if owner_fits {
        return owner;
    }

    // 可用库存最多的组织 (相同数量时取第一条，保证结果稳定)
    let largest = rows
        .iter()
        .filter(|r| r.quantity_available > 0)
        .fold(None::<&inventory::Model>, |best, r| match best {
            Some(b) if b.quantity_available >= r.quantity_available => Some(b),
            _ => Some(r),
        });

    // 都没有可用库存 (含退回且所属组织无记录) 时取第一条；
    // 行顺序由调用方决定，InventoryGateway::list_inventory 按组织 id 排序保证稳定
    largest.or_else(|| rows.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(org: Uuid, available: i64) -> inventory::Model {
        inventory::Model {
            id: Uuid::new_v4(),
            variant_id: Uuid::nil(),
            organization_id: org,
            quantity_on_hand: available,
            quantity_available: available,
            average_cost_cents: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_owner_with_enough_stock_wins() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let rows = vec![row(other, 10_000), row(owner, 30)];
        let target = select_target_inventory(&rows, owner, 30).unwrap();
        assert_eq!(target.organization_id, owner);
    }

    #[test]
    fn test_owner_short_falls_back_to_largest() {
        let owner = Uuid::new_v4();
        let small = Uuid::new_v4();
        let large = Uuid::new_v4();
        let rows = vec![row(owner, 5), row(small, 20), row(large, 50)];
        let target = select_target_inventory(&rows, owner, 10).unwrap();
        assert_eq!(target.organization_id, large);
    }

    #[test]
    fn test_return_prefers_owner_even_when_empty() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let rows = vec![row(other, 100), row(owner, 0)];
        let target = select_target_inventory(&rows, owner, -10).unwrap();
        assert_eq!(target.organization_id, owner);
    }

    #[test]
    fn test_return_without_owner_row_uses_largest() {
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![row(a, 3), row(b, 9)];
        let target = select_target_inventory(&rows, owner, -4).unwrap();
        assert_eq!(target.organization_id, b);
    }

    #[test]
    fn test_all_empty_falls_back_to_first_row() {
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![row(a, 0), row(b, 0)];
        let target = select_target_inventory(&rows, owner, 5).unwrap();
        assert_eq!(target.organization_id, a);
    }

    #[test]
    fn test_return_without_owner_row_all_empty_uses_first_row() {
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![row(a, 0), row(b, 0)];
        let target = select_target_inventory(&rows, owner, -7).unwrap();
        assert_eq!(target.organization_id, a);

        // 结果只取决于传入顺序
        let reversed = vec![row(b, 0), row(a, 0)];
        let target = select_target_inventory(&reversed, owner, -7).unwrap();
        assert_eq!(target.organization_id, b);
    }

    #[test]
    fn test_no_rows() {
        assert!(select_target_inventory(&[], Uuid::new_v4(), 5).is_none());
        assert!(select_target_inventory(&[], Uuid::new_v4(), -5).is_none());
    }

    #[test]
    fn test_ties_keep_first() {
        let owner = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![row(a, 40), row(b, 40)];
        let target = select_target_inventory(&rows, owner, 10).unwrap();
        assert_eq!(target.organization_id, a);
    }
}
